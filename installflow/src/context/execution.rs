//! The mutable state shared by every step of one run.

use super::{
    CertificateInfo, ExtensionSlot, InstallationMode, Manifest, PrivilegeLevel, RequestType,
    RunIdentity, StepRecord, StepRecords,
};
use crate::errors::ContextError;
use crate::utils::validate_pkgid;
use std::any::Any;
use std::path::{Path, PathBuf};

/// Shared, mutable state bag passed to every step.
///
/// Steps read fields written by earlier steps and write fields consumed by
/// later ones, so step order is a semantic dependency. Getters never fail;
/// setters that guard an invariant return a [`ContextError`].
#[derive(Debug, Default)]
pub struct ExecutionContext {
    run_id: RunIdentity,
    request_type: Option<RequestType>,
    pkgid: String,
    pkg_type: String,
    file_path: PathBuf,
    unpacked_dir_path: PathBuf,
    root_application_path: PathBuf,
    pkg_path: Option<PathBuf>,
    uid: u32,
    installation_mode: InstallationMode,
    privilege_level: PrivilegeLevel,
    manifest: Option<Manifest>,
    old_manifest: Option<Manifest>,
    certificate_info: Option<CertificateInfo>,
    backup_paths: Vec<PathBuf>,
    written_paths: Vec<PathBuf>,
    is_preload: bool,
    force_remove: bool,
    extension: ExtensionSlot,
    records: StepRecords,
}

impl ExecutionContext {
    /// Creates an empty context with a fresh run identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the package type label.
    #[must_use]
    pub fn with_pkg_type(mut self, pkg_type: impl Into<String>) -> Self {
        self.pkg_type = pkg_type.into();
        self
    }

    /// Sets the root directory applications are installed under.
    #[must_use]
    pub fn with_root_application_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_application_path = path.into();
        self
    }

    /// Sets the installation mode.
    #[must_use]
    pub fn with_installation_mode(mut self, mode: InstallationMode) -> Self {
        self.installation_mode = mode;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run_id(&self) -> &RunIdentity {
        &self.run_id
    }

    // -- request type ------------------------------------------------------

    /// Returns the request type, once the configuration step set it.
    #[must_use]
    pub fn request_type(&self) -> Option<RequestType> {
        self.request_type
    }

    /// Fixes the request type.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::RequestTypeLocked`] if a different request
    /// type was already set. Setting the same value again is a no-op.
    pub fn set_request_type(&mut self, request_type: RequestType) -> Result<(), ContextError> {
        match self.request_type {
            Some(current) if current != request_type => Err(ContextError::RequestTypeLocked {
                current,
                attempted: request_type,
            }),
            _ => {
                self.request_type = Some(request_type);
                Ok(())
            }
        }
    }

    // -- package identity --------------------------------------------------

    /// Returns the package id, empty if not known yet.
    #[must_use]
    pub fn pkgid(&self) -> &str {
        &self.pkgid
    }

    /// Returns the package id or fails if it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::EmptyPackageId`] if no step set it.
    pub fn require_pkgid(&self) -> Result<&str, ContextError> {
        if self.pkgid.is_empty() {
            Err(ContextError::EmptyPackageId)
        } else {
            Ok(&self.pkgid)
        }
    }

    /// Sets the package id after validating its format.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or malformed.
    pub fn set_pkgid(&mut self, pkgid: impl Into<String>) -> Result<(), ContextError> {
        let pkgid = pkgid.into();
        validate_pkgid(&pkgid)?;
        self.pkgid = pkgid;
        Ok(())
    }

    /// Returns the package type label.
    #[must_use]
    pub fn pkg_type(&self) -> &str {
        &self.pkg_type
    }

    /// Sets the package type label.
    pub fn set_pkg_type(&mut self, pkg_type: impl Into<String>) {
        self.pkg_type = pkg_type.into();
    }

    // -- paths -------------------------------------------------------------

    /// Returns the package archive path.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Sets the package archive path.
    pub fn set_file_path(&mut self, path: impl Into<PathBuf>) {
        self.file_path = path.into();
    }

    /// Returns the directory the archive was unpacked into, empty if none.
    #[must_use]
    pub fn unpacked_dir_path(&self) -> &Path {
        &self.unpacked_dir_path
    }

    /// Sets the unpacked directory.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingPath`] if the path is non-empty and
    /// does not exist.
    pub fn set_unpacked_dir_path(&mut self, path: impl Into<PathBuf>) -> Result<(), ContextError> {
        let path = path.into();
        if !path.as_os_str().is_empty() && !path.exists() {
            return Err(ContextError::MissingPath(path));
        }
        self.unpacked_dir_path = path;
        Ok(())
    }

    /// Clears the unpacked directory, e.g. after the step that created it removed it.
    pub fn clear_unpacked_dir_path(&mut self) {
        self.unpacked_dir_path = PathBuf::new();
    }

    /// Returns the root directory applications are installed under.
    #[must_use]
    pub fn root_application_path(&self) -> &Path {
        &self.root_application_path
    }

    /// Sets the root application path.
    pub fn set_root_application_path(&mut self, path: impl Into<PathBuf>) {
        self.root_application_path = path.into();
    }

    /// Returns the final package path.
    ///
    /// Defaults to `root_application_path/pkgid` unless a step overrode it.
    #[must_use]
    pub fn pkg_path(&self) -> PathBuf {
        self.pkg_path
            .clone()
            .unwrap_or_else(|| self.root_application_path.join(&self.pkgid))
    }

    /// Overrides the final package path.
    pub fn set_pkg_path(&mut self, path: impl Into<PathBuf>) {
        self.pkg_path = Some(path.into());
    }

    // -- user and privileges -----------------------------------------------

    /// Returns the target uid.
    #[must_use]
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Sets the target uid.
    pub fn set_uid(&mut self, uid: u32) {
        self.uid = uid;
    }

    /// Returns the installation mode.
    #[must_use]
    pub fn installation_mode(&self) -> InstallationMode {
        self.installation_mode
    }

    /// Sets the installation mode.
    pub fn set_installation_mode(&mut self, mode: InstallationMode) {
        self.installation_mode = mode;
    }

    /// Returns the privilege level.
    #[must_use]
    pub fn privilege_level(&self) -> PrivilegeLevel {
        self.privilege_level
    }

    /// Sets the privilege level.
    pub fn set_privilege_level(&mut self, level: PrivilegeLevel) {
        self.privilege_level = level;
    }

    // -- manifests and certificates ----------------------------------------

    /// Returns the parsed manifest of the package being processed.
    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Stores the parsed manifest.
    pub fn set_manifest(&mut self, manifest: Manifest) {
        self.manifest = Some(manifest);
    }

    /// Returns the manifest of the previously installed version.
    #[must_use]
    pub fn old_manifest(&self) -> Option<&Manifest> {
        self.old_manifest.as_ref()
    }

    /// Stores the manifest of the previously installed version.
    ///
    /// # Errors
    ///
    /// Fails if the request type does not allow an old manifest or if one
    /// was already stored.
    pub fn set_old_manifest(&mut self, manifest: Manifest) -> Result<(), ContextError> {
        let request = self
            .request_type
            .ok_or(ContextError::MissingField("request_type"))?;
        if !request.allows_old_manifest() {
            return Err(ContextError::OldManifestNotAllowed(request));
        }
        if self.old_manifest.is_some() {
            return Err(ContextError::OldManifestAlreadySet);
        }
        self.old_manifest = Some(manifest);
        Ok(())
    }

    /// Returns the certificate info.
    #[must_use]
    pub fn certificate_info(&self) -> Option<&CertificateInfo> {
        self.certificate_info.as_ref()
    }

    /// Stores the certificate info and adopts its privilege level.
    pub fn set_certificate_info(&mut self, info: CertificateInfo) {
        self.privilege_level = info.level;
        self.certificate_info = Some(info);
    }

    // -- flags -------------------------------------------------------------

    /// Returns true for preload installs.
    #[must_use]
    pub fn is_preload(&self) -> bool {
        self.is_preload
    }

    /// Sets the preload flag.
    pub fn set_preload(&mut self, preload: bool) {
        self.is_preload = preload;
    }

    /// Returns true if missing package parts should be tolerated.
    #[must_use]
    pub fn force_remove(&self) -> bool {
        self.force_remove
    }

    /// Sets the force-remove flag.
    pub fn set_force_remove(&mut self, force: bool) {
        self.force_remove = force;
    }

    // -- tracked paths -----------------------------------------------------

    /// Returns backup paths created so far.
    #[must_use]
    pub fn backup_paths(&self) -> &[PathBuf] {
        &self.backup_paths
    }

    /// Remembers a backup path.
    pub fn add_backup_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.backup_paths.contains(&path) {
            self.backup_paths.push(path);
        }
    }

    /// Forgets a backup path once it was restored or removed.
    pub fn remove_backup_path(&mut self, path: &Path) {
        self.backup_paths.retain(|p| p != path);
    }

    /// Returns the paths written during this run.
    #[must_use]
    pub fn written_paths(&self) -> &[PathBuf] {
        &self.written_paths
    }

    /// Remembers a written path so it is flushed before the run ends.
    pub fn track_written(&mut self, path: impl Into<PathBuf>) {
        self.written_paths.push(path.into());
    }

    // -- extension ---------------------------------------------------------

    /// Stores a backend-specific payload.
    pub fn set_extension<T: Any + Send>(&mut self, value: T) {
        self.extension.set(value);
    }

    /// Returns the backend-specific payload if it has type `T`.
    #[must_use]
    pub fn extension<T: Any + Send>(&self) -> Option<&T> {
        self.extension.get::<T>()
    }

    /// Returns the backend-specific payload mutably if it has type `T`.
    pub fn extension_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.extension.get_mut::<T>()
    }

    /// Removes the backend-specific payload if it has type `T`.
    pub fn take_extension<T: Any + Send>(&mut self) -> Option<T> {
        self.extension.take::<T>()
    }

    // -- records -----------------------------------------------------------

    /// Returns the accumulated step results.
    #[must_use]
    pub fn records(&self) -> &StepRecords {
        &self.records
    }

    /// Appends a step result.
    pub fn record(&mut self, record: StepRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DeltaExtension;

    #[test]
    fn test_request_type_lock() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.request_type().is_none());

        ctx.set_request_type(RequestType::Install).unwrap();
        ctx.set_request_type(RequestType::Install).unwrap();

        let err = ctx.set_request_type(RequestType::Update).unwrap_err();
        assert_eq!(
            err,
            ContextError::RequestTypeLocked {
                current: RequestType::Install,
                attempted: RequestType::Update,
            }
        );
        assert_eq!(ctx.request_type(), Some(RequestType::Install));
    }

    #[test]
    fn test_pkgid_validation() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(ctx.require_pkgid(), Err(ContextError::EmptyPackageId));

        assert!(ctx.set_pkgid("").is_err());
        assert!(ctx.set_pkgid("../escape").is_err());
        assert_eq!(ctx.pkgid(), "");

        ctx.set_pkgid("org.example.app").unwrap();
        assert_eq!(ctx.require_pkgid(), Ok("org.example.app"));
    }

    #[test]
    fn test_unpacked_dir_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = ExecutionContext::new();

        let missing = tmp.path().join("missing");
        assert_eq!(
            ctx.set_unpacked_dir_path(&missing),
            Err(ContextError::MissingPath(missing))
        );

        ctx.set_unpacked_dir_path(tmp.path()).unwrap();
        assert_eq!(ctx.unpacked_dir_path(), tmp.path());

        ctx.clear_unpacked_dir_path();
        assert!(ctx.unpacked_dir_path().as_os_str().is_empty());
        ctx.set_unpacked_dir_path("").unwrap();
    }

    #[test]
    fn test_pkg_path_derivation() {
        let mut ctx = ExecutionContext::new().with_root_application_path("/opt/apps");
        ctx.set_pkgid("org.example.app").unwrap();
        assert_eq!(ctx.pkg_path(), PathBuf::from("/opt/apps/org.example.app"));

        ctx.set_pkg_path("/opt/preload/org.example.app");
        assert_eq!(ctx.pkg_path(), PathBuf::from("/opt/preload/org.example.app"));
    }

    #[test]
    fn test_old_manifest_rules() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(
            ctx.set_old_manifest(Manifest::default()),
            Err(ContextError::MissingField("request_type"))
        );

        ctx.set_request_type(RequestType::Install).unwrap();
        assert_eq!(
            ctx.set_old_manifest(Manifest::default()),
            Err(ContextError::OldManifestNotAllowed(RequestType::Install))
        );

        let mut ctx = ExecutionContext::new();
        ctx.set_request_type(RequestType::Update).unwrap();
        ctx.set_old_manifest(Manifest::new("a.b", "1")).unwrap();
        assert_eq!(
            ctx.set_old_manifest(Manifest::new("a.b", "2")),
            Err(ContextError::OldManifestAlreadySet)
        );
        assert_eq!(ctx.old_manifest().unwrap().version, "1");
    }

    #[test]
    fn test_certificate_sets_privilege() {
        let mut ctx = ExecutionContext::new();
        ctx.set_certificate_info(CertificateInfo {
            level: PrivilegeLevel::Partner,
            ..CertificateInfo::default()
        });
        assert_eq!(ctx.privilege_level(), PrivilegeLevel::Partner);
    }

    #[test]
    fn test_backup_paths_are_deduplicated() {
        let mut ctx = ExecutionContext::new();
        ctx.add_backup_path("/a.bck");
        ctx.add_backup_path("/a.bck");
        ctx.add_backup_path("/b.bck");
        assert_eq!(ctx.backup_paths().len(), 2);

        ctx.remove_backup_path(Path::new("/a.bck"));
        assert_eq!(ctx.backup_paths(), &[PathBuf::from("/b.bck")]);
    }

    #[test]
    fn test_extension_slot() {
        let mut ctx = ExecutionContext::new();
        ctx.set_extension(DeltaExtension {
            removed: vec![PathBuf::from("old.so")],
            ..DeltaExtension::default()
        });

        assert_eq!(ctx.extension::<DeltaExtension>().unwrap().removed.len(), 1);
        ctx.extension_mut::<DeltaExtension>()
            .unwrap()
            .added
            .push(PathBuf::from("new.so"));
        assert_eq!(ctx.take_extension::<DeltaExtension>().unwrap().len(), 2);
        assert!(ctx.extension::<DeltaExtension>().is_none());
    }
}

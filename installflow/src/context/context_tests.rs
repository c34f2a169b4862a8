//! Cross-type tests for the context module.

#[cfg(test)]
mod tests {
    use crate::context::{
        DeltaExtension, ExecutionContext, InstallRequest, InstallationMode, Manifest,
        PrivilegeLevel, RequestType, StepRecord,
    };
    use crate::core::{Phase, StepStatus};
    use crate::errors::ContextError;
    use std::path::PathBuf;

    #[test]
    fn test_context_defaults() {
        let ctx = ExecutionContext::new();
        assert!(ctx.request_type().is_none());
        assert_eq!(ctx.pkgid(), "");
        assert_eq!(ctx.installation_mode(), InstallationMode::Online);
        assert_eq!(ctx.privilege_level(), PrivilegeLevel::Unknown);
        assert!(ctx.manifest().is_none());
        assert!(ctx.written_paths().is_empty());
        assert!(ctx.records().is_empty());
        assert!(!ctx.is_preload());
        assert!(!ctx.force_remove());
    }

    #[test]
    fn test_context_fields_flow_between_writers() {
        let request = InstallRequest::new(RequestType::Update)
            .with_file_path("/tmp/pkg.zip")
            .with_uid(5001);

        let mut ctx = ExecutionContext::new().with_root_application_path("/opt/apps");
        ctx.set_request_type(request.request_type).unwrap();
        ctx.set_file_path(request.file_path.clone().unwrap());
        ctx.set_uid(request.uid);

        // A later step learns the id from the manifest.
        ctx.set_manifest(Manifest::new("org.example.app", "2.0"));
        let pkgid = ctx.manifest().unwrap().package_id.clone();
        ctx.set_pkgid(pkgid).unwrap();

        ctx.set_old_manifest(Manifest::new("org.example.app", "1.0"))
            .unwrap();

        assert_eq!(ctx.uid(), 5001);
        assert_eq!(ctx.file_path(), PathBuf::from("/tmp/pkg.zip"));
        assert_eq!(ctx.pkg_path(), PathBuf::from("/opt/apps/org.example.app"));
        assert_eq!(ctx.old_manifest().unwrap().version, "1.0");
    }

    #[test]
    fn test_every_update_like_request_accepts_old_manifest() {
        for request in RequestType::ALL {
            let mut ctx = ExecutionContext::new();
            ctx.set_request_type(request).unwrap();
            let result = ctx.set_old_manifest(Manifest::default());
            if request.allows_old_manifest() {
                assert!(result.is_ok(), "{request} should accept an old manifest");
            } else {
                assert_eq!(result, Err(ContextError::OldManifestNotAllowed(request)));
            }
        }
    }

    #[test]
    fn test_context_error_maps_to_status() {
        assert_eq!(
            StepStatus::from(ContextError::EmptyPackageId),
            StepStatus::InvalidValue
        );
        assert_eq!(
            StepStatus::from(ContextError::MissingPath(PathBuf::from("/nope"))),
            StepStatus::PackageNotFound
        );
    }

    #[test]
    fn test_records_and_extension_coexist() {
        let mut ctx = ExecutionContext::new();
        ctx.set_extension(DeltaExtension::default());
        ctx.record(StepRecord {
            index: 0,
            step: "configure".to_string(),
            phase: Phase::Process,
            status: StepStatus::Ok,
            duration_ms: 0.1,
            message: None,
        });

        assert_eq!(ctx.records().len(), 1);
        assert!(ctx.extension::<DeltaExtension>().unwrap().is_empty());
        assert!(ctx.extension::<String>().is_none());
    }

    #[test]
    fn test_tracked_written_paths_keep_order() {
        let mut ctx = ExecutionContext::new();
        ctx.track_written("/a");
        ctx.track_written("/b");
        assert_eq!(
            ctx.written_paths(),
            &[PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }
}

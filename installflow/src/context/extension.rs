//! Package-kind specific payload riding on the shared context.

use std::any::{Any, TypeId};
use std::fmt;
use std::path::PathBuf;

/// A type-erased slot holding at most one backend-specific payload.
///
/// Backends store whatever their steps need to share (delta file lists,
/// widget config, ...) without the core context knowing its shape.
#[derive(Default)]
pub struct ExtensionSlot {
    value: Option<Box<dyn Any + Send>>,
    type_name: Option<&'static str>,
}

impl ExtensionSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload, replacing any previous one.
    pub fn set<T: Any + Send>(&mut self, value: T) {
        self.value = Some(Box::new(value));
        self.type_name = Some(std::any::type_name::<T>());
    }

    /// Returns the payload if it has type `T`.
    #[must_use]
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns the payload mutably if it has type `T`.
    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.value.as_mut().and_then(|v| v.downcast_mut::<T>())
    }

    /// Removes and returns the payload if it has type `T`.
    ///
    /// A payload of a different type stays in place.
    pub fn take<T: Any + Send>(&mut self) -> Option<T> {
        if !self.holds::<T>() {
            return None;
        }
        self.type_name = None;
        self.value
            .take()
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if the slot holds a payload of type `T`.
    #[must_use]
    pub fn holds<T: Any + Send>(&self) -> bool {
        self.value
            .as_ref()
            .is_some_and(|v| (**v).type_id() == TypeId::of::<T>())
    }

    /// Returns true if the slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Debug for ExtensionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionSlot")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// File lists computed for a delta update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaExtension {
    /// Files the patch adds.
    pub added: Vec<PathBuf>,
    /// Files the patch modifies.
    pub modified: Vec<PathBuf>,
    /// Files the patch removes.
    pub removed: Vec<PathBuf>,
}

impl DeltaExtension {
    /// Total number of touched files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Returns true if the patch touches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

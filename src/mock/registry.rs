//! Lookup of mock handles by class identity.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    mock::{Mock, MockHandle, StubTarget},
    runtime::ClassId,
};

/// Maps each any-instance stub target to its mock handle.
///
/// Handles are created lazily on first access and keep a stable identity
/// for repeated lookups until they are reset. Forwarders hold a shared
/// reference to the registry and look the handle up on every call.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use anystub::{mock::{Mock, MockRegistry}, runtime::ClassId};
///
/// let mocks: MockRegistry<Mock> = MockRegistry::new();
/// let first = mocks.mock_for(ClassId(1));
/// let second = mocks.mock_for(ClassId(1));
/// assert!(Arc::ptr_eq(&first, &second));
///
/// mocks.reset(ClassId(1));
/// assert!(!Arc::ptr_eq(&first, &mocks.mock_for(ClassId(1))));
/// ```
pub struct MockRegistry<M: MockHandle = Mock> {
    handles: DashMap<ClassId, Arc<M>>,
}

impl<M: MockHandle> Default for MockRegistry<M> {
    fn default() -> Self {
        MockRegistry {
            handles: DashMap::new(),
        }
    }
}

impl<M: MockHandle> MockRegistry<M> {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for a class, creating it if absent
    pub fn mock_for(&self, class: ClassId) -> Arc<M> {
        self.handles
            .entry(class)
            .or_insert_with(|| Arc::new(M::for_target(StubTarget::AnyInstance(class))))
            .value()
            .clone()
    }

    /// Returns the handle for a class without creating one
    #[must_use]
    pub fn get(&self, class: ClassId) -> Option<Arc<M>> {
        self.handles.get(&class).map(|entry| entry.value().clone())
    }

    /// Drops the configuration for one method of a class's mock.
    ///
    /// Once the mock has nothing configured any more it is reset and
    /// discarded; the next [`MockRegistry::mock_for`] creates a fresh one.
    pub fn unstub(&self, class: ClassId, method: &str) {
        let Some(handle) = self.get(class) else {
            return;
        };

        handle.unstub(method);
        if !handle.has_expectations() {
            self.reset(class);
        }
    }

    /// Resets and discards the handle for a class
    pub fn reset(&self, class: ClassId) {
        if let Some((_, handle)) = self.handles.remove(&class) {
            handle.reset();
            log::trace!("discarded mock for {class}");
        }
    }

    /// Resets and discards every handle
    pub fn reset_all(&self) {
        let classes: Vec<ClassId> = self.handles.iter().map(|entry| *entry.key()).collect();
        for class in classes {
            self.reset(class);
        }
    }

    /// Returns the number of live handles
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no handle is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<M: MockHandle> std::fmt::Debug for MockRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRegistry")
            .field("handle_count", &self.handles.len())
            .finish()
    }
}

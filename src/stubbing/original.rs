//! Capture and restoration of pre-stub method definitions.
//!
//! An [`OriginalMethodRecord`] is a snapshot of what a class looked like for
//! one method name right before it was stubbed. The
//! [`OriginalMethodRegistry`] takes those snapshots and, later, puts the class
//! back the way the snapshot describes.
//!
//! # Owned vs. inherited
//!
//! Only a definition the class owns is snapshotted. When the method is
//! merely inherited (or not defined anywhere) the record carries no
//! implementation, and restoring it removes whatever the interceptor added
//! so lookup falls through to the ancestors again. Restoration never
//! introduces a definition the class did not have before.

use std::sync::Arc;

use crate::{
    runtime::{ClassId, ClassRegistry, MethodDef, Visibility},
    stubbing::{probe, RestoreStrategy},
    Error, Result,
};

/// Snapshot of a method taken right before it is stubbed.
///
/// Immutable once captured; consumed by [`OriginalMethodRegistry::restore`].
#[derive(Clone, Debug)]
pub struct OriginalMethodRecord {
    owner: ClassId,
    method_name: String,
    implementation: Option<MethodDef>,
    visibility: Option<Visibility>,
}

impl OriginalMethodRecord {
    /// The class the method was stubbed on
    #[must_use]
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// The stubbed method name
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The captured definition, present only if the owner defined the method itself
    #[must_use]
    pub fn implementation(&self) -> Option<&MethodDef> {
        self.implementation.as_ref()
    }

    /// Visibility of the definition the method resolved to at capture time,
    /// ignoring active forwarders (`None` when undefined)
    #[must_use]
    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    /// Whether the owner defined the method directly before stubbing
    #[must_use]
    pub fn existed_before(&self) -> bool {
        self.implementation.is_some()
    }
}

/// Takes and restores [`OriginalMethodRecord`]s for one runtime.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use anystub::{
///     runtime::{ClassBuilder, ClassRegistry, Value, Visibility},
///     stubbing::{OriginalMethodRegistry, RestoreStrategy},
/// };
///
/// let runtime = Arc::new(ClassRegistry::new());
/// let account = ClassBuilder::new("Account")
///     .private_method("audit", |_| Ok(Value::Nil))
///     .build(&runtime)?;
///
/// let originals = OriginalMethodRegistry::new(runtime.clone(), RestoreStrategy::Shim, true);
/// let record = originals.capture(account, "audit")?;
/// assert!(record.existed_before());
/// assert_eq!(record.visibility(), Some(Visibility::Private));
///
/// let missing = originals.capture(account, "nothing")?;
/// assert!(!missing.existed_before());
/// assert_eq!(missing.visibility(), None);
/// # Ok::<(), anystub::Error>(())
/// ```
pub struct OriginalMethodRegistry {
    runtime: Arc<ClassRegistry>,
    strategy: RestoreStrategy,
    verify_visibility: bool,
}

impl OriginalMethodRegistry {
    /// Creates a registry restoring with the given strategy
    #[must_use]
    pub fn new(
        runtime: Arc<ClassRegistry>,
        strategy: RestoreStrategy,
        verify_visibility: bool,
    ) -> Self {
        OriginalMethodRegistry {
            runtime,
            strategy,
            verify_visibility,
        }
    }

    /// Returns the strategy restorations are performed with
    #[must_use]
    pub fn strategy(&self) -> RestoreStrategy {
        self.strategy
    }

    /// Snapshots `name` on `class`.
    ///
    /// A name that is only inherited, or not defined at all, still yields a
    /// valid record without an implementation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class or one of its ancestors
    /// is unknown.
    pub fn capture(&self, class: ClassId, name: &str) -> Result<OriginalMethodRecord> {
        let implementation = self.runtime.own_method(class, name)?;
        let visibility = probe::defined_visibility(&self.runtime, class, name)?;

        Ok(OriginalMethodRecord {
            owner: class,
            method_name: name.to_string(),
            implementation,
            visibility,
        })
    }

    /// Returns true if restorations are checked against the captured visibility
    #[must_use]
    pub fn verifies_visibility(&self) -> bool {
        self.verify_visibility
    }

    /// Puts the owner back the way `record` describes, then verifies the
    /// result if verification is enabled.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if the owner has been frozen since capture
    /// - [`Error::VisibilityMismatch`] if verification is enabled and the
    ///   restored visibility differs from the captured one
    pub fn restore(&self, record: &OriginalMethodRecord) -> Result<()> {
        self.reinstate(record)?;
        if self.verify_visibility {
            self.verify(record)?;
        }
        Ok(())
    }

    /// Puts the owner back the way `record` describes.
    ///
    /// - With an implementation, the captured definition is written back in a
    ///   single table write; the overwrite strategy additionally reapplies the
    ///   captured visibility through the owner-scoped visibility primitive.
    /// - Without one, only interceptor-installed definitions are removed so
    ///   ancestor lookup resumes.
    ///
    /// A frozen owner is rejected before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the owner has been frozen since capture.
    pub fn reinstate(&self, record: &OriginalMethodRecord) -> Result<()> {
        let owner = record.owner;
        let name = record.method_name.as_str();

        match self.strategy {
            RestoreStrategy::Shim => {
                self.runtime.remove_from_layer(owner, name)?;
                if let Some(original) = &record.implementation {
                    self.runtime.replace_method(owner, original.clone())?;
                }
            }
            RestoreStrategy::Overwrite => match &record.implementation {
                Some(original) => {
                    self.runtime.replace_method(owner, original.clone())?;
                    self.runtime
                        .set_visibility(owner, name, original.visibility)?;
                }
                None => {
                    let installed = self.runtime.own_method(owner, name)?;
                    if installed.is_some_and(|def| def.is_forwarder()) {
                        self.runtime.remove_method(owner, name)?;
                    }
                }
            },
        }
        Ok(())
    }

    /// Checks that `record`'s method resolves with the captured visibility.
    ///
    /// Forwarders still active on other classes of the chain are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VisibilityMismatch`] on any difference.
    pub fn verify(&self, record: &OriginalMethodRecord) -> Result<()> {
        let actual = probe::defined_visibility(&self.runtime, record.owner, &record.method_name)?;
        if actual != record.visibility {
            return Err(Error::VisibilityMismatch {
                class: self.runtime.name_of(record.owner),
                method: record.method_name.clone(),
                expected: record.visibility,
                actual,
            });
        }
        Ok(())
    }
}

//! Any-instance interceptor.
//!
//! [`AnyInstanceInterceptor`] replaces the behavior of every instance of a
//! class for selected method names and guarantees the original behavior is
//! put back afterwards.
//!
//! # Lifecycle
//!
//! Each `(class, method)` pair moves through [`StubState`]:
//!
//! ```text
//! Unstubbed ──stub()──► Stubbed ──unstub()──► Restored
//!     ▲                                           │
//!     └──────────── stub() again ◄────────────────┘
//! ```
//!
//! `stub()` captures the original through the [`OriginalMethodRegistry`],
//! then installs a forwarding entry, either in the class's
//! [`DispatchShim`] or directly over the class's own definition, depending on
//! the [`RestoreStrategy`] chosen at construction. Every capture is pushed on
//! a restoration stack; [`AnyInstanceInterceptor::unstub_all`] pops it, so
//! teardown always runs in reverse installation order.
//!
//! # Failure Semantics
//!
//! - `stub()` fails with `NotSupported` when the class cannot host a shim and
//!   leaves nothing half-installed.
//! - `unstub()` of a pair that is not stubbed is a no-op.
//! - Teardown keeps restoring past individual failures and reports them all
//!   together as `Error::Teardown`.
//! - A restoration the class rejects leaves that stub active and its capture
//!   on the stack, so state never claims `Restored` while a forwarder is live.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use crate::{
    mock::{Mock, MockHandle, MockRegistry},
    runtime::{ClassId, ClassRegistry, MethodDef, Visibility},
    stubbing::{
        probe,
        shim::{forwarder, DispatchShim},
        InterceptorConfig, OriginalMethodRecord, OriginalMethodRegistry, RestoreStrategy,
    },
    Error, Result,
};

/// Interception state of one `(class, method)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubState {
    /// No interception active
    Unstubbed,
    /// Forwarding installed, original captured; also kept when the class
    /// rejected a restoration
    Stubbed,
    /// Original behavior reinstated; may be stubbed again
    Restored,
}

/// Orchestrates capture, forwarding and restoration per `(class, method)` pair.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use anystub::{
///     runtime::{ClassBuilder, ClassRegistry, Value},
///     stubbing::AnyInstanceInterceptor,
/// };
///
/// let runtime = Arc::new(ClassRegistry::new());
/// let account = ClassBuilder::new("Account")
///     .method("balance", |_| Ok(Value::Int(100)))
///     .build(&runtime)?;
///
/// let mut interceptor: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());
/// interceptor.stub(account, "balance")?;
/// interceptor.mock_for(account).returns("balance", Value::Int(42));
///
/// let instance = runtime.new_instance(account)?;
/// assert_eq!(runtime.call(instance, "balance", &[], None)?, Value::Int(42));
///
/// interceptor.unstub(account, "balance")?;
/// assert_eq!(runtime.call(instance, "balance", &[], None)?, Value::Int(100));
/// # Ok::<(), anystub::Error>(())
/// ```
pub struct AnyInstanceInterceptor<M: MockHandle = Mock> {
    runtime: Arc<ClassRegistry>,
    mocks: Arc<MockRegistry<M>>,
    originals: OriginalMethodRegistry,
    shims: HashMap<ClassId, DispatchShim>,
    stack: Vec<OriginalMethodRecord>,
    states: HashMap<(ClassId, String), StubState>,
}

impl<M: MockHandle> AnyInstanceInterceptor<M> {
    /// Creates an interceptor with the default configuration.
    ///
    /// The restoration strategy is detected from the runtime's capabilities.
    #[must_use]
    pub fn new(runtime: Arc<ClassRegistry>) -> Self {
        Self::with_config(runtime, InterceptorConfig::default())
    }

    /// Creates an interceptor with an explicit configuration
    #[must_use]
    pub fn with_config(runtime: Arc<ClassRegistry>, config: InterceptorConfig) -> Self {
        let strategy = config
            .strategy
            .unwrap_or_else(|| RestoreStrategy::detect(runtime.capabilities()));
        log::debug!("any-instance interceptor restoring with the {strategy} strategy");

        AnyInstanceInterceptor {
            originals: OriginalMethodRegistry::new(
                runtime.clone(),
                strategy,
                config.verify_visibility,
            ),
            runtime,
            mocks: Arc::new(MockRegistry::new()),
            shims: HashMap::new(),
            stack: Vec::new(),
            states: HashMap::new(),
        }
    }

    /// The runtime this interceptor mutates
    #[must_use]
    pub fn runtime(&self) -> &Arc<ClassRegistry> {
        &self.runtime
    }

    /// The mock registry forwarders dispatch into
    #[must_use]
    pub fn mocks(&self) -> &Arc<MockRegistry<M>> {
        &self.mocks
    }

    /// The restoration strategy selected at construction
    #[must_use]
    pub fn strategy(&self) -> RestoreStrategy {
        self.originals.strategy()
    }

    /// Returns the mock handle for a class, creating it if absent
    pub fn mock_for(&self, class: ClassId) -> Arc<M> {
        self.mocks.mock_for(class)
    }

    /// Returns the interception state of a pair
    #[must_use]
    pub fn state(&self, class: ClassId, name: &str) -> StubState {
        self.states
            .get(&(class, name.to_string()))
            .copied()
            .unwrap_or(StubState::Unstubbed)
    }

    /// Returns true while the pair is stubbed
    #[must_use]
    pub fn is_stubbed(&self, class: ClassId, name: &str) -> bool {
        self.state(class, name) == StubState::Stubbed
    }

    /// Names currently stubbed on a class, in installation order
    #[must_use]
    pub fn stubbed_methods(&self, class: ClassId) -> Vec<String> {
        self.stack
            .iter()
            .filter(|record| record.owner() == class)
            .map(|record| record.method_name().to_string())
            .collect()
    }

    /// Determines the visibility `name` currently resolves with on `class`.
    ///
    /// Probes public, then protected, then private (inherited included);
    /// `None` means the method is undefined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class is unknown.
    pub fn determine_visibility(&self, class: ClassId, name: &str) -> Result<Option<Visibility>> {
        probe::determine_visibility(&self.runtime, class, name)
    }

    /// Intercepts `name` for every instance of `class`.
    ///
    /// Stubbing a pair that is already stubbed reuses the existing capture.
    /// An undefined or inherited method is a supported target.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if the class cannot host a shim
    /// - [`Error::ClassNotFound`] if the class is unknown
    pub fn stub(&mut self, class: ClassId, name: &str) -> Result<()> {
        if self.is_stubbed(class, name) {
            log::trace!(
                "{}#{name} is already stubbed, reusing capture",
                self.runtime.name_of(class)
            );
            return Ok(());
        }

        let target = self.runtime.class(class)?;
        if target.is_frozen() {
            return Err(Error::NotSupported {
                class: target.name.clone(),
                reason: "can't stub methods of a frozen class".to_string(),
            });
        }

        let record = self.originals.capture(class, name)?;
        let visibility = record.visibility().unwrap_or(Visibility::Public);
        self.install_forwarder(class, name, visibility, record.implementation())?;

        log::debug!(
            "stubbed any instance of {}#{name} (owned: {}, visibility: {:?})",
            target.name,
            record.existed_before(),
            record.visibility()
        );
        self.stack.push(record);
        self.states
            .insert((class, name.to_string()), StubState::Stubbed);
        Ok(())
    }

    fn install_forwarder(
        &mut self,
        class: ClassId,
        name: &str,
        visibility: Visibility,
        original: Option<&MethodDef>,
    ) -> Result<()> {
        match self.originals.strategy() {
            RestoreStrategy::Shim => {
                let shim = match self.shims.entry(class) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        entry.insert(DispatchShim::install(&self.runtime, class)?)
                    }
                };

                if let Err(err) = shim.forward(&self.runtime, &self.mocks, name, visibility) {
                    self.unlink_if_idle(class)?;
                    return Err(err);
                }
                Ok(())
            }
            RestoreStrategy::Overwrite => {
                let mut def = MethodDef::forwarder(name, visibility, forwarder(&self.mocks));
                if let Some(original) = original {
                    def = def.shadowing(original.clone());
                }
                self.runtime.replace_method(class, def).map(|_| ())
            }
        }
    }

    /// Reinstates the original behavior of `name` on `class`.
    ///
    /// A pair that is not currently stubbed is left alone.
    ///
    /// # Errors
    ///
    /// - [`Error::VisibilityMismatch`] if the restored visibility differs from the captured one
    /// - [`Error::NotSupported`] if the class was frozen while stubbed
    pub fn unstub(&mut self, class: ClassId, name: &str) -> Result<()> {
        match self.release(class, name) {
            Err(Error::AlreadyRestored { class, method }) => {
                log::trace!("{class}#{method} is not stubbed, nothing to restore");
                Ok(())
            }
            result => result,
        }
    }

    /// Takes the capture for a pair off the stack and restores it.
    ///
    /// If the class rejects the restoration, the capture goes back on the
    /// stack and the pair stays [`StubState::Stubbed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRestored`] if the pair is not stubbed, plus
    /// any restoration failure.
    pub fn release(&mut self, class: ClassId, name: &str) -> Result<()> {
        let Some(position) = self
            .stack
            .iter()
            .rposition(|record| record.owner() == class && record.method_name() == name)
        else {
            return Err(Error::AlreadyRestored {
                class: self.runtime.name_of(class),
                method: name.to_string(),
            });
        };

        let record = self.stack.remove(position);
        let result = self.restore_record(&record);
        if self.is_stubbed(class, name) {
            self.stack.insert(position, record);
        }
        result
    }

    /// Restores every active stub in reverse installation order.
    ///
    /// A failing restoration does not stop the others; stubs whose class
    /// rejected the restoration stay active. Afterwards every mock handle is
    /// reset and discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Teardown`] carrying every failure, in the order they
    /// occurred.
    pub fn unstub_all(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        let mut retained = Vec::new();
        while let Some(record) = self.stack.pop() {
            if let Err(err) = self.restore_record(&record) {
                log::warn!(
                    "failed to restore {}#{}: {err}",
                    self.runtime.name_of(record.owner()),
                    record.method_name()
                );
                failures.push(err);
            }
            if self.is_stubbed(record.owner(), record.method_name()) {
                retained.push(record);
            }
        }
        retained.reverse();
        self.stack = retained;
        self.mocks.reset_all();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }

    fn restore_record(&mut self, record: &OriginalMethodRecord) -> Result<()> {
        let class = record.owner();
        let name = record.method_name();

        self.originals.reinstate(record)?;
        self.states
            .insert((class, name.to_string()), StubState::Restored);
        if let Some(shim) = self.shims.get_mut(&class) {
            shim.release(name);
        }
        self.mocks.unstub(class, name);
        let unlinked = self.unlink_if_idle(class);
        log::debug!("restored {}#{name}", self.runtime.name_of(class));

        let verified = if self.originals.verifies_visibility() {
            self.originals.verify(record)
        } else {
            Ok(())
        };
        verified.and(unlinked)
    }

    fn unlink_if_idle(&mut self, class: ClassId) -> Result<()> {
        if !self.shims.get(&class).is_some_and(DispatchShim::is_empty) {
            return Ok(());
        }
        match self.shims.remove(&class) {
            Some(shim) => shim.uninstall(&self.runtime),
            None => Ok(()),
        }
    }
}

impl<M: MockHandle> std::fmt::Debug for AnyInstanceInterceptor<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyInstanceInterceptor")
            .field("strategy", &self.strategy())
            .field("active_stubs", &self.stack.len())
            .field("shims", &self.shims.len())
            .finish()
    }
}

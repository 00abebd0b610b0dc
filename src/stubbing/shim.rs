//! Dispatch shim: the forwarding layer ahead of a stubbed class.
//!
//! A [`DispatchShim`] is the interceptor's handle on the override layer the
//! runtime links ahead of a class. It tracks which names this interceptor
//! currently forwards to its mocks and unlinks the layer once the layer is
//! empty.
//!
//! Every forwarding entry shares the same shape: whatever the receiver,
//! method name, arguments and block of the call, they are handed to
//! `mock_for(receiver.class())` and the mock's result, `Ok` or `Err`, is
//! returned to the caller untouched.

use std::sync::Arc;

use crate::{
    mock::{MockHandle, MockRegistry},
    runtime::{CallContext, ClassId, ClassRegistry, MethodBody, MethodDef, Visibility},
    Result,
};

/// Builds the body shared by all forwarding entries.
///
/// The mock is looked up on every call by the receiver's class, so two
/// instances of one class reach the same handle while an unrelated class
/// never does.
pub fn forwarder<M: MockHandle>(mocks: &Arc<MockRegistry<M>>) -> MethodBody {
    let mocks = Arc::clone(mocks);
    Arc::new(move |ctx: &CallContext<'_>| mocks.mock_for(ctx.receiver.class()).dispatch(ctx))
}

/// Handle on the override layer linked ahead of one class.
#[derive(Debug)]
pub struct DispatchShim {
    class: ClassId,
    forwarded: Vec<String>,
}

impl DispatchShim {
    /// Links an override layer ahead of `class`, reusing one already linked.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if the class cannot host a layer.
    pub fn install(runtime: &ClassRegistry, class: ClassId) -> Result<Self> {
        if runtime.prepend_layer(class)? {
            log::debug!("installed dispatch shim on {}", runtime.name_of(class));
        }
        Ok(DispatchShim {
            class,
            forwarded: Vec::new(),
        })
    }

    /// The class this shim sits in front of
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Names currently forwarded, in installation order
    #[must_use]
    pub fn forwarded(&self) -> &[String] {
        &self.forwarded
    }

    /// Returns true if `name` is forwarded
    #[must_use]
    pub fn forwards(&self, name: &str) -> bool {
        self.forwarded.iter().any(|forwarded| forwarded == name)
    }

    /// Returns true if nothing is forwarded any more
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forwarded.is_empty()
    }

    /// Defines a forwarding entry for `name` with the given visibility.
    ///
    /// Forwarding a name twice keeps a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if the layer cannot be written.
    pub fn forward<M: MockHandle>(
        &mut self,
        runtime: &ClassRegistry,
        mocks: &Arc<MockRegistry<M>>,
        name: &str,
        visibility: Visibility,
    ) -> Result<()> {
        if self.forwards(name) {
            return Ok(());
        }

        runtime.define_in_layer(
            self.class,
            MethodDef::forwarder(name, visibility, forwarder(mocks)),
        )?;
        self.forwarded.push(name.to_string());
        Ok(())
    }

    /// Stops tracking `name`; its layer entry is removed by restoration.
    ///
    /// Returns false if the name was not forwarded.
    pub fn release(&mut self, name: &str) -> bool {
        let before = self.forwarded.len();
        self.forwarded.retain(|forwarded| forwarded != name);
        self.forwarded.len() != before
    }

    /// Unlinks the layer from the class once nothing is left in it.
    ///
    /// Several interceptors may forward through the same layer; whichever
    /// empties it last unlinks it. Entries placed by another interceptor keep
    /// the layer linked.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if the class has been frozen.
    pub fn uninstall(self, runtime: &ClassRegistry) -> Result<()> {
        if runtime.unlink_empty_layer(self.class)? {
            log::debug!("removed dispatch shim from {}", runtime.name_of(self.class));
        } else {
            log::debug!(
                "override layer on {} still forwards for another interceptor, leaving it linked",
                runtime.name_of(self.class)
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mock::{Mock, MockRegistry},
        runtime::Value,
        test::{define_account, define_ledger},
        Error,
    };

    #[test]
    fn test_forward_routes_to_receiver_class_mock() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        let mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());
        mocks.mock_for(account).returns("balance", Value::Int(42));

        let mut shim = DispatchShim::install(&runtime, account).unwrap();
        shim.forward(&runtime, &mocks, "balance", Visibility::Public)
            .unwrap();

        let first = runtime.new_instance(account).unwrap();
        let second = runtime.new_instance(account).unwrap();
        assert_eq!(
            runtime.call(first, "balance", &[], None).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            runtime.call(second, "balance", &[], None).unwrap(),
            Value::Int(42)
        );

        let invocations = mocks.mock_for(account).invocations();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].receiver, first);
        assert_eq!(invocations[1].receiver, second);
    }

    #[test]
    fn test_forward_is_idempotent() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        let mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());

        let mut shim = DispatchShim::install(&runtime, account).unwrap();
        shim.forward(&runtime, &mocks, "balance", Visibility::Public)
            .unwrap();
        let entry = runtime.layer_method(account, "balance").unwrap().unwrap();

        shim.forward(&runtime, &mocks, "balance", Visibility::Public)
            .unwrap();
        let again = runtime.layer_method(account, "balance").unwrap().unwrap();
        assert!(entry.same_body(&again));
        assert_eq!(shim.forwarded(), ["balance".to_string()]);
    }

    #[test]
    fn test_forwarder_mirrors_visibility() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        let mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());

        let mut shim = DispatchShim::install(&runtime, account).unwrap();
        shim.forward(&runtime, &mocks, "audit", Visibility::Private)
            .unwrap();

        let instance = runtime.new_instance(account).unwrap();
        assert!(matches!(
            runtime.call(instance, "audit", &[], None),
            Err(Error::NotAccessible { .. })
        ));
    }

    #[test]
    fn test_unrelated_class_is_not_routed() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        let ledger = define_ledger(&runtime);
        let mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());

        let mut shim = DispatchShim::install(&runtime, account).unwrap();
        shim.forward(&runtime, &mocks, "balance", Visibility::Public)
            .unwrap();

        let instance = runtime.new_instance(ledger).unwrap();
        assert_eq!(
            runtime.call(instance, "balance", &[], None).unwrap(),
            Value::Int(-5)
        );
        assert!(mocks.get(account).is_none());
        assert!(mocks.get(ledger).is_none());
    }

    #[test]
    fn test_install_on_frozen_class_fails() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        runtime.freeze(account).unwrap();

        assert!(matches!(
            DispatchShim::install(&runtime, account),
            Err(Error::NotSupported { .. })
        ));
        assert!(!runtime.has_layer(account).unwrap());
    }

    #[test]
    fn test_release_and_uninstall() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        let mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());

        let mut shim = DispatchShim::install(&runtime, account).unwrap();
        shim.forward(&runtime, &mocks, "balance", Visibility::Public)
            .unwrap();
        assert!(shim.release("balance"));
        assert!(!shim.release("balance"));
        assert!(shim.is_empty());

        runtime.remove_from_layer(account, "balance").unwrap();
        shim.uninstall(&runtime).unwrap();
        assert!(!runtime.has_layer(account).unwrap());
    }

    #[test]
    fn test_uninstall_keeps_layer_shared_with_another_shim() {
        let runtime = ClassRegistry::new();
        let account = define_account(&runtime);
        let first_mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());
        let second_mocks: Arc<MockRegistry<Mock>> = Arc::new(MockRegistry::new());
        first_mocks.mock_for(account).returns("balance", Value::Int(42));

        let mut first = DispatchShim::install(&runtime, account).unwrap();
        first
            .forward(&runtime, &first_mocks, "balance", Visibility::Public)
            .unwrap();
        let mut second = DispatchShim::install(&runtime, account).unwrap();
        second
            .forward(&runtime, &second_mocks, "rate", Visibility::Protected)
            .unwrap();

        second.release("rate");
        runtime.remove_from_layer(account, "rate").unwrap();
        second.uninstall(&runtime).unwrap();

        assert!(runtime.has_layer(account).unwrap());
        let instance = runtime.new_instance(account).unwrap();
        assert_eq!(
            runtime.call(instance, "balance", &[], None).unwrap(),
            Value::Int(42)
        );
    }
}

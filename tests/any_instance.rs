//! Integration tests for any-instance stubbing.
//!
//! Every scenario runs against both restoration strategies: the override
//! layer shim of a modern runtime and the in-place overwrite used when the
//! runtime cannot insert ahead in the resolution order.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anystub::{
    mock::{MockHandle, StubTarget},
    prelude::*,
};

fn runtimes() -> [(RuntimeConfig, RestoreStrategy); 2] {
    [
        (RuntimeConfig::default(), RestoreStrategy::Shim),
        (RuntimeConfig::legacy(), RestoreStrategy::Overwrite),
    ]
}

fn define_account(runtime: &ClassRegistry) -> Result<ClassId> {
    ClassBuilder::new("Account")
        .method("balance", |_| Ok(Value::Int(100)))
        .method("deposit", |ctx| {
            Ok(Value::Int(100 + ctx.arg(0).as_int().unwrap_or_default()))
        })
        .private_method("audit", |_| Ok(Value::from("audited")))
        .build(runtime)
}

fn define_base_and_sub(runtime: &ClassRegistry) -> Result<(ClassId, ClassId)> {
    let base = ClassBuilder::new("Base")
        .method("name", |_| Ok(Value::from("base")))
        .protected_method("kind", |_| Ok(Value::from("protected base")))
        .build(runtime)?;
    let sub = ClassBuilder::new("Sub").superclass(base).build(runtime)?;
    Ok((base, sub))
}

fn call(runtime: &ClassRegistry, class: ClassId, method: &str) -> Result<Value> {
    let instance = runtime.new_instance(class)?;
    runtime.call(instance, method, &[], None)
}

/// Stubbing `balance` answers 42 for any instance, unstubbing brings back 100.
#[test]
fn test_account_balance_scenario() -> Result<()> {
    for (config, strategy) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let before = runtime.new_instance(account)?;

        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());
        assert_eq!(interceptor.strategy(), strategy);

        interceptor.stub(account, "balance")?;
        interceptor
            .mock_for(account)
            .returns("balance", Value::Int(42));

        assert_eq!(call(&runtime, account, "balance")?, Value::Int(42));
        assert_eq!(runtime.call(before, "balance", &[], None)?, Value::Int(42));

        interceptor.unstub(account, "balance")?;
        assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
        assert_eq!(runtime.call(before, "balance", &[], None)?, Value::Int(100));
    }
    Ok(())
}

/// An inherited method leaves no direct definition on the subclass after a round trip.
#[test]
fn test_inherited_method_round_trip() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let (base, sub) = define_base_and_sub(&runtime)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(sub, "name")?;
        interceptor.mock_for(sub).returns("name", Value::from("stubbed"));
        assert_eq!(call(&runtime, sub, "name")?, Value::from("stubbed"));
        assert_eq!(call(&runtime, base, "name")?, Value::from("base"));

        interceptor.unstub(sub, "name")?;

        let own = runtime.instance_methods(sub, Visibility::Public, false)?;
        assert!(!own.iter().any(|name| name == "name"));
        assert!(!runtime.has_layer(sub)?);
        assert_eq!(runtime.resolve(sub, "name")?.map(|r| r.owner), Some(base));
        assert_eq!(call(&runtime, sub, "name")?, Value::from("base"));
    }
    Ok(())
}

/// Owned methods come back with the same visibility and behavior.
#[test]
fn test_owned_method_keeps_visibility_and_behavior() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let instance = runtime.new_instance(account)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(account, "audit")?;
        interceptor.stub(account, "deposit")?;
        assert_eq!(
            interceptor.determine_visibility(account, "audit")?,
            Some(Visibility::Private)
        );

        interceptor.unstub(account, "audit")?;
        interceptor.unstub(account, "deposit")?;

        assert_eq!(
            interceptor.determine_visibility(account, "audit")?,
            Some(Visibility::Private)
        );
        assert!(matches!(
            runtime.call(instance, "audit", &[], None),
            Err(Error::NotAccessible { .. })
        ));
        assert_eq!(
            runtime.send(instance, "audit", &[], None)?,
            Value::from("audited")
        );
        assert_eq!(
            runtime.call(instance, "deposit", &[Value::Int(5)], None)?,
            Value::Int(105)
        );
    }
    Ok(())
}

/// Protected inherited methods keep their visibility through a round trip.
#[test]
fn test_inherited_protected_method_round_trip() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let (_, sub) = define_base_and_sub(&runtime)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(sub, "kind")?;
        assert_eq!(
            interceptor.determine_visibility(sub, "kind")?,
            Some(Visibility::Protected)
        );
        interceptor.unstub(sub, "kind")?;

        assert!(runtime.own_method(sub, "kind")?.is_none());
        assert_eq!(
            interceptor.determine_visibility(sub, "kind")?,
            Some(Visibility::Protected)
        );
    }
    Ok(())
}

/// Stubbing twice installs one forwarding entry; one unstub removes it entirely.
#[test]
fn test_double_stub_single_unstub() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let original = runtime
            .own_method(account, "balance")?
            .ok_or(Error::ClassNotFound(account))?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(account, "balance")?;
        interceptor.stub(account, "balance")?;
        assert_eq!(interceptor.stubbed_methods(account), vec!["balance"]);

        interceptor.unstub(account, "balance")?;
        assert!(!runtime.has_layer(account)?);

        let resolved = runtime
            .resolve(account, "balance")?
            .ok_or(Error::ClassNotFound(account))?;
        assert!(!resolved.in_layer);
        assert!(!resolved.def.is_forwarder());
        assert!(resolved.def.same_body(&original));
        assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
    }
    Ok(())
}

/// Instances of the stubbed class share one handle; unrelated classes never reach it.
#[test]
fn test_routing_by_receiver_class() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let ledger = ClassBuilder::new("Ledger")
            .method("balance", |_| Ok(Value::Int(-5)))
            .build(&runtime)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(account, "balance")?;
        let mock = interceptor.mock_for(account);
        mock.returns("balance", Value::Int(42));

        let first = runtime.new_instance(account)?;
        let second = runtime.new_instance(account)?;
        runtime.call(first, "balance", &[], None)?;
        runtime.call(second, "balance", &[], None)?;
        assert!(Arc::ptr_eq(&mock, &interceptor.mock_for(account)));

        let receivers: Vec<Instance> = mock.invocations().iter().map(|i| i.receiver).collect();
        assert_eq!(receivers, vec![first, second]);

        assert_eq!(call(&runtime, ledger, "balance")?, Value::Int(-5));
        assert_eq!(mock.invocation_count("balance"), 2);
        assert!(interceptor.mocks().get(ledger).is_none());

        interceptor.unstub_all()?;
    }
    Ok(())
}

/// Arguments and the trailing block reach the mock; results and errors come back unchanged.
#[test]
fn test_call_site_semantics_preserved() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let instance = runtime.new_instance(account)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(account, "deposit")?;
        interceptor.stub(account, "each")?;
        interceptor.stub(account, "balance")?;

        let mock = interceptor.mock_for(account);
        mock.answers("deposit", |ctx| {
            Ok(Value::Int(ctx.arg(0).as_int().unwrap_or_default() * 10))
        });
        mock.yields("each", vec![Value::Int(1), Value::Int(2)]);
        mock.raises("balance", "account locked");

        assert_eq!(
            runtime.call(instance, "deposit", &[Value::Int(3)], None)?,
            Value::Int(30)
        );

        let block = Block::new(|args| {
            Ok(Value::Int(args.iter().filter_map(Value::as_int).sum()))
        });
        assert_eq!(
            runtime.call(instance, "each", &[], Some(&block))?,
            Value::Int(3)
        );

        let err = runtime.call(instance, "balance", &[], None).unwrap_err();
        assert_eq!(err.to_string(), "account locked");

        interceptor.unstub_all()?;
        assert!(!runtime.method_defined(account, "each")?);
    }
    Ok(())
}

/// A failing test body still restores every stub before the next test runs.
#[test]
fn test_error_mid_body_restores() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;

        let mut first: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());
        let outcome: Result<()> = first.isolated(|stubs| {
            stubs.stub(account, "balance")?;
            stubs.mock_for(account).returns("balance", Value::Int(42));
            Err(Error::Raised("unrelated failure".to_string()))
        });
        assert!(matches!(outcome, Err(Error::Raised(ref m)) if m == "unrelated failure"));

        let second: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());
        assert!(!second.is_stubbed(account, "balance"));
        assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
    }
    Ok(())
}

/// One broken restoration does not keep the others from running.
#[test]
fn test_teardown_continues_past_failures() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let ledger = ClassBuilder::new("Ledger")
            .method("balance", |_| Ok(Value::Int(-5)))
            .build(&runtime)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        interceptor.stub(account, "balance")?;
        interceptor.stub(ledger, "balance")?;
        interceptor.stub(account, "deposit")?;
        runtime.freeze(ledger)?;

        match interceptor.unstub_all() {
            Err(Error::Teardown(failures)) => {
                assert_eq!(failures.len(), 1);
                assert!(matches!(failures[0], Error::NotSupported { ref class, .. } if class == "Ledger"));
            }
            other => panic!("expected teardown failure, got {other:?}"),
        }

        assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
        assert!(interceptor.stubbed_methods(account).is_empty());
        assert_eq!(interceptor.stubbed_methods(ledger), vec!["balance"]);
        assert!(interceptor.is_stubbed(ledger, "balance"));
        assert!(interceptor.mocks().is_empty());
    }
    Ok(())
}

/// Frozen classes are rejected up front with nothing installed.
#[test]
fn test_frozen_class_not_supported() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let sealed = ClassBuilder::new("Sealed")
            .method("balance", |_| Ok(Value::Int(1)))
            .frozen()
            .build(&runtime)?;
        let mut interceptor: AnyInstanceInterceptor =
            AnyInstanceInterceptor::new(runtime.clone());

        let err = interceptor.stub(sealed, "balance").unwrap_err();
        assert!(matches!(err, Error::NotSupported { .. }));
        assert_eq!(interceptor.state(sealed, "balance"), StubState::Unstubbed);
        assert_eq!(call(&runtime, sealed, "balance")?, Value::Int(1));
    }
    Ok(())
}

/// `unstub` on something never stubbed, or already restored, is a no-op.
#[test]
fn test_unstub_is_idempotent() -> Result<()> {
    let runtime = Arc::new(ClassRegistry::new());
    let account = define_account(&runtime)?;
    let mut interceptor: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());

    interceptor.unstub(account, "balance")?;
    interceptor.stub(account, "balance")?;
    interceptor.unstub(account, "balance")?;
    interceptor.unstub(account, "balance")?;
    assert_eq!(interceptor.state(account, "balance"), StubState::Restored);
    assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
    Ok(())
}

/// Disabling verification still restores, and the overwrite strategy can be forced.
#[test]
fn test_forced_overwrite_on_modern_runtime() -> Result<()> {
    let runtime = Arc::new(ClassRegistry::new());
    let account = define_account(&runtime)?;
    let config = InterceptorConfig::new()
        .with_strategy(RestoreStrategy::Overwrite)
        .with_visibility_check(false);
    let mut interceptor: AnyInstanceInterceptor =
        AnyInstanceInterceptor::with_config(runtime.clone(), config);

    interceptor.stub(account, "balance")?;
    assert!(!runtime.has_layer(account)?);
    assert!(runtime
        .own_method(account, "balance")?
        .is_some_and(|def| def.is_forwarder()));

    interceptor.unstub(account, "balance")?;
    assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
    Ok(())
}

/// Counts calls instead of answering with canned responses.
struct CountingMock {
    calls: AtomicUsize,
}

impl MockHandle for CountingMock {
    fn for_target(_target: StubTarget) -> Self {
        CountingMock {
            calls: AtomicUsize::new(0),
        }
    }

    fn dispatch(&self, _ctx: &CallContext<'_>) -> Result<Value> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Int(previous as i64 + 1))
    }

    fn unstub(&self, _method: &str) {}

    fn has_expectations(&self) -> bool {
        self.calls.load(Ordering::SeqCst) > 0
    }

    fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

/// The interceptor works with any mock handle implementation.
#[test]
fn test_custom_mock_handle() -> Result<()> {
    let runtime = Arc::new(ClassRegistry::new());
    let account = define_account(&runtime)?;
    let mut interceptor: AnyInstanceInterceptor<CountingMock> =
        AnyInstanceInterceptor::new(runtime.clone());

    interceptor.stub(account, "balance")?;
    assert_eq!(call(&runtime, account, "balance")?, Value::Int(1));
    assert_eq!(call(&runtime, account, "balance")?, Value::Int(2));

    interceptor.unstub(account, "balance")?;
    assert!(interceptor.mocks().get(account).is_some());
    assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));

    interceptor.unstub_all()?;
    assert!(interceptor.mocks().is_empty());
    Ok(())
}

/// A stub session dropped at scope end restores its stubs.
#[test]
fn test_session_scope() -> Result<()> {
    let runtime = Arc::new(ClassRegistry::new());
    let (_, sub) = define_base_and_sub(&runtime)?;
    let mut interceptor: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());

    {
        let mut session = interceptor.session();
        session.stub(sub, "name")?;
        session.mock_for(sub).returns("name", Value::from("sub"));
        assert_eq!(call(&runtime, sub, "name")?, Value::from("sub"));
    }

    assert_eq!(call(&runtime, sub, "name")?, Value::from("base"));
    assert_eq!(interceptor.state(sub, "name"), StubState::Restored);
    Ok(())
}

/// Two interceptors stubbing one class leave each other's forwarders in place.
#[test]
fn test_interceptors_share_a_class() -> Result<()> {
    for (config, _) in runtimes() {
        let runtime = Arc::new(ClassRegistry::with_config(config));
        let account = define_account(&runtime)?;
        let mut first: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());
        let mut second: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());

        first.stub(account, "balance")?;
        first.mock_for(account).returns("balance", Value::Int(1));
        second.stub(account, "deposit")?;
        second.mock_for(account).returns("deposit", Value::Int(2));

        first.unstub_all()?;
        assert_eq!(call(&runtime, account, "balance")?, Value::Int(100));
        assert_eq!(call(&runtime, account, "deposit")?, Value::Int(2));

        second.unstub_all()?;
        assert_eq!(call(&runtime, account, "deposit")?, Value::Int(100));
        assert!(runtime
            .own_method(account, "deposit")?
            .is_some_and(|def| !def.is_forwarder()));
    }
    Ok(())
}

/// A superclass and its subclass stubbed together restore cleanly in either order.
#[test]
fn test_nested_stubs_restore_in_either_order() -> Result<()> {
    for (config, _) in runtimes() {
        for base_first in [true, false] {
            let runtime = Arc::new(ClassRegistry::with_config(config.clone()));
            let (base, sub) = define_base_and_sub(&runtime)?;
            let mut interceptor: AnyInstanceInterceptor =
                AnyInstanceInterceptor::new(runtime.clone());

            for name in ["name", "kind"] {
                interceptor.stub(base, name)?;
                interceptor.stub(sub, name)?;
            }

            let order = if base_first { [base, sub] } else { [sub, base] };
            for class in order {
                for name in ["name", "kind"] {
                    interceptor.unstub(class, name)?;
                }
            }

            assert_eq!(call(&runtime, sub, "name")?, Value::from("base"));
            assert_eq!(
                interceptor.determine_visibility(sub, "kind")?,
                Some(Visibility::Protected)
            );
            assert!(runtime.own_method(sub, "name")?.is_none());
        }
    }
    Ok(())
}

//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::runtime::{CallContext, ClassBuilder, ClassId, ClassRegistry, MethodBody, Value};

/// `Account` with public `balance` (100), protected `rate` (5) and private `audit`.
pub fn define_account(registry: &ClassRegistry) -> ClassId {
    ClassBuilder::new("Account")
        .method("balance", |_| Ok(Value::Int(100)))
        .protected_method("rate", |_| Ok(Value::Int(5)))
        .private_method("audit", |_| Ok(Value::from("audited")))
        .build(registry)
        .unwrap()
}

/// `Base` with public `name` and private `secret`, and an empty `Sub < Base`.
pub fn define_base_and_sub(registry: &ClassRegistry) -> (ClassId, ClassId) {
    let base = ClassBuilder::new("Base")
        .method("name", |_| Ok(Value::from("base")))
        .private_method("secret", |_| Ok(Value::from("hidden")))
        .build(registry)
        .unwrap();
    let sub = ClassBuilder::new("Sub")
        .superclass(base)
        .build(registry)
        .unwrap();
    (base, sub)
}

/// `Ledger`, unrelated to `Account`, with its own public `balance` (-5).
pub fn define_ledger(registry: &ClassRegistry) -> ClassId {
    ClassBuilder::new("Ledger")
        .method("balance", |_| Ok(Value::Int(-5)))
        .build(registry)
        .unwrap()
}

/// Shared body answering `Nil`, for hand-built forwarders.
pub fn nil_body() -> MethodBody {
    Arc::new(|_: &CallContext<'_>| Ok(Value::Nil))
}

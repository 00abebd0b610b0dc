//! The contract between the interceptor and a mock.

use crate::{
    runtime::{CallContext, ClassId, Instance, Value},
    Result,
};

/// Scope of an interception.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StubTarget {
    /// A single object
    SingleObject(Instance),
    /// Every current and future instance of a class
    AnyInstance(ClassId),
}

/// A mock that receives forwarded calls for a [`StubTarget`].
///
/// Forwarders installed by the interceptor hand every intercepted call to
/// [`MockHandle::dispatch`] and propagate its result, `Ok` or `Err`, to the
/// call site unchanged.
pub trait MockHandle: Send + Sync + 'static {
    /// Creates a fresh handle for a target
    fn for_target(target: StubTarget) -> Self
    where
        Self: Sized;

    /// Produces the result of an intercepted call.
    ///
    /// # Errors
    ///
    /// Any error returned here is raised at the call site, unchanged.
    fn dispatch(&self, ctx: &CallContext<'_>) -> Result<Value>;

    /// Drops everything configured for `method`
    fn unstub(&self, method: &str);

    /// Returns true while any method still has a configured response
    fn has_expectations(&self) -> bool;

    /// Clears all configuration and recorded state
    fn reset(&self);
}

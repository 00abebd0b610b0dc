//! Scoped stubbing with guaranteed teardown.
//!
//! A [`StubSession`] borrows an [`AnyInstanceInterceptor`] for the duration of
//! a test. Whatever way the session ends (an explicit [`StubSession::finish`],
//! an early return, an error propagated with `?` or a panic), every stub it
//! installed is restored.

use std::ops::{Deref, DerefMut};

use crate::{
    mock::{Mock, MockHandle},
    stubbing::AnyInstanceInterceptor,
    Result,
};

/// Guard that restores every active stub when it goes out of scope.
///
/// Dereferences to the interceptor, so `stub`/`unstub`/`mock_for` are called
/// on the session directly.
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
/// let instance = runtime.new_instance(account)?;
///
/// let mut interceptor: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());
/// {
///     let mut session = interceptor.session();
///     session.stub(account, "balance")?;
///     session.mock_for(account).returns("balance", Value::Int(42));
///     assert_eq!(runtime.call(instance, "balance", &[], None)?, Value::Int(42));
/// }
/// assert_eq!(runtime.call(instance, "balance", &[], None)?, Value::Int(100));
/// # Ok::<(), anystub::Error>(())
/// ```
pub struct StubSession<'a, M: MockHandle = Mock> {
    interceptor: &'a mut AnyInstanceInterceptor<M>,
    finished: bool,
}

impl<'a, M: MockHandle> StubSession<'a, M> {
    pub(crate) fn new(interceptor: &'a mut AnyInstanceInterceptor<M>) -> Self {
        StubSession {
            interceptor,
            finished: false,
        }
    }

    /// Ends the session, restoring every active stub.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Teardown`] if any restoration failed.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.interceptor.unstub_all()
    }
}

impl<M: MockHandle> Deref for StubSession<'_, M> {
    type Target = AnyInstanceInterceptor<M>;

    fn deref(&self) -> &Self::Target {
        self.interceptor
    }
}

impl<M: MockHandle> DerefMut for StubSession<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interceptor
    }
}

impl<M: MockHandle> Drop for StubSession<'_, M> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.interceptor.unstub_all() {
            log::error!("stub session teardown failed: {err}");
        }
    }
}

impl<M: MockHandle> AnyInstanceInterceptor<M> {
    /// Opens a session whose end restores every active stub
    pub fn session(&mut self) -> StubSession<'_, M> {
        StubSession::new(self)
    }

    /// Runs `body` and restores every active stub afterwards.
    ///
    /// Teardown runs whether `body` succeeds, fails or panics. An error from
    /// `body` takes precedence over a teardown error.
    ///
    /// # Errors
    ///
    /// Returns the error of `body`, otherwise the teardown error.
    pub fn isolated<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut AnyInstanceInterceptor<M>) -> Result<T>,
    {
        let mut session = self.session();
        let outcome = body(&mut *session);
        let teardown = session.finish();

        let value = outcome?;
        teardown?;
        Ok(value)
    }
}

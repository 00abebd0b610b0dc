//! Default [`MockHandle`] implementation.
//!
//! [`Mock`] answers intercepted calls with canned [`Response`]s configured per
//! method name and records every invocation it receives.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use dashmap::DashMap;

use crate::{
    mock::{MockHandle, StubTarget},
    runtime::{CallContext, Instance, Value},
    Error, Result,
};

/// Function signature of a computed response.
pub type AnswerFn = dyn Fn(&CallContext<'_>) -> Result<Value> + Send + Sync;

/// What a mock does when a configured method is invoked.
#[derive(Clone)]
pub enum Response {
    /// Return a fixed value
    Returns(Value),
    /// Raise an error with this message
    Raises(String),
    /// Call the trailing block with these arguments and return its result
    Yields(Vec<Value>),
    /// Compute the result from the call context
    Answers(Arc<AnswerFn>),
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Returns(value) => f.debug_tuple("Returns").field(value).finish(),
            Response::Raises(message) => f.debug_tuple("Raises").field(message).finish(),
            Response::Yields(args) => f.debug_tuple("Yields").field(args).finish(),
            Response::Answers(_) => f.write_str("Answers(..)"),
        }
    }
}

/// A call received by a mock.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    /// The object the call was made on
    pub receiver: Instance,
    /// The invoked method
    pub method: String,
    /// Positional arguments
    pub args: Vec<Value>,
    /// Whether a trailing block was passed
    pub with_block: bool,
}

/// Mock with per-method canned responses and an invocation log.
///
/// # Examples
///
/// ```rust
/// use anystub::{mock::{Mock, MockHandle, StubTarget}, runtime::{ClassId, Value}};
///
/// let mock = Mock::for_target(StubTarget::AnyInstance(ClassId(1)));
/// mock.returns("balance", Value::Int(42));
/// assert!(mock.has_expectations());
///
/// mock.unstub("balance");
/// assert!(!mock.has_expectations());
/// ```
pub struct Mock {
    target: StubTarget,
    responses: DashMap<String, Response>,
    invocations: RwLock<Vec<Invocation>>,
}

impl Mock {
    /// Returns the target this mock was created for
    #[must_use]
    pub fn target(&self) -> StubTarget {
        self.target
    }

    /// Configures the response for a method, replacing any previous one
    pub fn respond(&self, method: &str, response: Response) {
        self.responses.insert(method.to_string(), response);
    }

    /// Makes `method` return `value`
    pub fn returns(&self, method: &str, value: impl Into<Value>) {
        self.respond(method, Response::Returns(value.into()));
    }

    /// Makes `method` raise an error carrying `message`
    pub fn raises(&self, method: &str, message: impl Into<String>) {
        self.respond(method, Response::Raises(message.into()));
    }

    /// Makes `method` call its block with `args`
    pub fn yields(&self, method: &str, args: Vec<Value>) {
        self.respond(method, Response::Yields(args));
    }

    /// Makes `method` compute its result from the call context
    pub fn answers<F>(&self, method: &str, answer: F)
    where
        F: Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.respond(method, Response::Answers(Arc::new(answer)));
    }

    /// Returns every invocation received so far, oldest first
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many times `method` was invoked
    #[must_use]
    pub fn invocation_count(&self, method: &str) -> usize {
        self.invocations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|invocation| invocation.method == method)
            .count()
    }
}

impl MockHandle for Mock {
    fn for_target(target: StubTarget) -> Self {
        Mock {
            target,
            responses: DashMap::new(),
            invocations: RwLock::new(Vec::new()),
        }
    }

    fn dispatch(&self, ctx: &CallContext<'_>) -> Result<Value> {
        write_lock!(self.invocations).push(Invocation {
            receiver: ctx.receiver,
            method: ctx.method.to_string(),
            args: ctx.args.to_vec(),
            with_block: ctx.block.is_some(),
        });

        // Clone out of the map so a computed answer may reconfigure the mock.
        let response = self
            .responses
            .get(ctx.method)
            .map(|entry| entry.value().clone());

        match response {
            Some(Response::Returns(value)) => Ok(value),
            Some(Response::Raises(message)) => Err(raised!(message)),
            Some(Response::Yields(args)) => ctx.yield_block(&args),
            Some(Response::Answers(answer)) => answer(ctx),
            None => Err(Error::UnexpectedInvocation {
                receiver: ctx.runtime.name_of(ctx.receiver.class()),
                method: ctx.method.to_string(),
                args: ctx.args.len(),
            }),
        }
    }

    fn unstub(&self, method: &str) {
        self.responses.remove(method);
    }

    fn has_expectations(&self) -> bool {
        !self.responses.is_empty()
    }

    fn reset(&self) {
        self.responses.clear();
        self.invocations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("target", &self.target)
            .field("responses", &self.responses.len())
            .finish_non_exhaustive()
    }
}

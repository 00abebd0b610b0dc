//! Method definitions and their call context.
//!
//! A [`MethodDef`] pairs a name with a shared implementation ([`MethodBody`])
//! and a [`Visibility`]. Definitions are cheap to clone: the body is
//! reference-counted, so a captured snapshot and the live table entry share
//! the very same implementation and can be compared by identity.

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter};

use crate::{
    runtime::{Block, ClassRegistry, Instance, Value},
    Result,
};

/// Accessibility of a method.
///
/// Variants are declared in probe priority order: iterating with
/// [`strum::IntoEnumIterator`] yields `Public`, then `Protected`, then `Private`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Visibility {
    /// Callable from anywhere
    Public,
    /// Callable only from within the class hierarchy
    Protected,
    /// Callable only with an implicit receiver
    Private,
}

/// How a method definition came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    /// Written by the program
    Defined,
    /// Installed by the interceptor to forward calls to a mock
    Forwarder,
}

/// Everything a method body gets to see about the call in progress.
pub struct CallContext<'a> {
    /// The registry the call was dispatched through; bodies may re-enter it
    pub runtime: &'a ClassRegistry,
    /// The object receiving the call
    pub receiver: Instance,
    /// Name the method was invoked under
    pub method: &'a str,
    /// Positional arguments
    pub args: &'a [Value],
    /// Optional trailing block
    pub block: Option<&'a Block>,
}

impl CallContext<'_> {
    /// Returns the positional argument at `index`, or `Nil` when absent
    #[must_use]
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Calls the trailing block, or returns `Nil` when no block was given
    ///
    /// # Errors
    ///
    /// Returns whatever error the block raises.
    pub fn yield_block(&self, args: &[Value]) -> Result<Value> {
        match self.block {
            Some(block) => block.call(args),
            None => Ok(Value::Nil),
        }
    }
}

/// Function signature of a method implementation.
pub type MethodFn = dyn Fn(&CallContext<'_>) -> Result<Value> + Send + Sync;

/// Shared method implementation.
pub type MethodBody = Arc<MethodFn>;

/// A named method with its implementation and visibility.
#[derive(Clone)]
pub struct MethodDef {
    /// Method name, unique within one method table
    pub name: String,
    /// The implementation
    pub body: MethodBody,
    /// Accessibility of the method
    pub visibility: Visibility,
    /// Origin of the definition
    pub kind: MethodKind,
    /// Definition an overwriting forwarder replaced in its owner's table
    pub shadowed: Option<Box<MethodDef>>,
}

impl MethodDef {
    /// Creates a program-defined method from a closure
    pub fn new<F>(name: impl Into<String>, visibility: Visibility, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_body(name, visibility, Arc::new(body))
    }

    /// Creates a program-defined method from an existing shared body
    pub fn from_body(name: impl Into<String>, visibility: Visibility, body: MethodBody) -> Self {
        MethodDef {
            name: name.into(),
            body,
            visibility,
            kind: MethodKind::Defined,
            shadowed: None,
        }
    }

    /// Creates a forwarding definition as installed by the interceptor
    pub fn forwarder(name: impl Into<String>, visibility: Visibility, body: MethodBody) -> Self {
        MethodDef {
            name: name.into(),
            body,
            visibility,
            kind: MethodKind::Forwarder,
            shadowed: None,
        }
    }

    /// Records the definition this forwarder replaces in place
    #[must_use]
    pub fn shadowing(mut self, original: MethodDef) -> Self {
        self.shadowed = Some(Box::new(original));
        self
    }

    /// Returns the program-defined method behind this entry.
    ///
    /// A forwarder yields the definition it shadows, if any.
    #[must_use]
    pub fn defined(&self) -> Option<&MethodDef> {
        if self.is_forwarder() {
            self.shadowed.as_deref().and_then(MethodDef::defined)
        } else {
            Some(self)
        }
    }

    /// Returns a copy with a different visibility, sharing the same body
    #[must_use]
    pub fn with_visibility(&self, visibility: Visibility) -> Self {
        MethodDef {
            visibility,
            ..self.clone()
        }
    }

    /// Returns true if both definitions share the very same implementation
    #[must_use]
    pub fn same_body(&self, other: &MethodDef) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    /// Returns true if this definition was installed by the interceptor
    #[must_use]
    pub fn is_forwarder(&self) -> bool {
        self.kind == MethodKind::Forwarder
    }

    pub(crate) fn invoke(&self, ctx: &CallContext<'_>) -> Result<Value> {
        (self.body)(ctx)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

//! Values passed through method dispatch.
//!
//! [`Value`] is the argument and return type of every method body and mock
//! response. [`Instance`] is the handle of an object, and [`Block`] is the
//! optional trailing callable a caller may hand to a method.

use std::{fmt, sync::Arc};

use crate::{runtime::ClassId, Result};

/// Handle of an object living in a [`ClassRegistry`](crate::runtime::ClassRegistry).
///
/// Instances carry no state of their own; all behavior is looked up on their
/// class at call time, which is what lets an any-instance stub affect objects
/// created before the stub was installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instance {
    id: u64,
    class: ClassId,
}

impl Instance {
    pub(crate) fn new(id: u64, class: ClassId) -> Self {
        Instance { id, class }
    }

    /// Returns the unique object id
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the class this object was instantiated from
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }
}

/// A dynamically typed value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// String
    Str(String),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Reference to an object
    Object(Instance),
}

impl Value {
    /// Returns the integer payload, if this is an [`Value::Int`]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a [`Value::Str`]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Ruby-style truthiness: only `Nil` and `Bool(false)` are false
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(value)
    }
}

/// Function signature of a block.
pub type BlockFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Optional trailing callable passed along with a method call.
///
/// Cloning a block is cheap; clones share the same closure.
#[derive(Clone)]
pub struct Block(Arc<BlockFn>);

impl Block {
    /// Wraps a closure as a block
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Block(Arc::new(f))
    }

    /// Invokes the block with the given arguments
    ///
    /// # Errors
    ///
    /// Returns whatever error the block itself raises.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Block(..)")
    }
}

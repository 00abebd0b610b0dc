//! Class-based dispatch runtime.
//!
//! This module provides the object model the interceptor operates on: a
//! registry of classes with single inheritance, per-class method tables with
//! visibility, an optional override layer ahead of each class, and method
//! dispatch for instances.
//!
//! # Key Components
//!
//! - [`ClassRegistry`] - Owns classes, resolves and dispatches method calls
//! - [`Class`] - A class with its own method table and optional override layer
//! - [`MethodDef`] - Named method implementation with a [`Visibility`]
//! - [`ClassBuilder`] - Fluent class definition
//! - [`RuntimeConfig`] - Structural capabilities of the runtime
//!
//! # Examples
//!
//! ```rust
//! use anystub::runtime::{ClassBuilder, ClassRegistry, Value};
//!
//! let registry = ClassRegistry::new();
//! let account = ClassBuilder::new("Account")
//!     .method("deposit", |ctx| Ok(Value::Int(100 + ctx.arg(0).as_int().unwrap_or(0))))
//!     .build(&registry)?;
//!
//! let instance = registry.new_instance(account)?;
//! let result = registry.call(instance, "deposit", &[Value::Int(5)], None)?;
//! assert_eq!(result, Value::Int(105));
//! # Ok::<(), anystub::Error>(())
//! ```

mod builder;
mod class;
mod config;
mod id;
mod method;
mod registry;
mod value;

pub use builder::ClassBuilder;
pub use class::{Class, ClassFlags, ClassRc, MethodTable};
pub use config::{Capabilities, RuntimeConfig};
pub use id::ClassId;
pub use method::{CallContext, MethodBody, MethodDef, MethodFn, MethodKind, Visibility};
pub use registry::{ClassRegistry, ResolvedMethod};
pub use value::{Block, BlockFn, Instance, Value};

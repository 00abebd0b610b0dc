// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # anystub
//!
//! Any-instance method stubbing for a class-based dispatch runtime.
//!
//! `anystub` temporarily replaces the behavior of a method for **every**
//! instance of a class, routes those calls to a mock collaborator, and
//! afterwards reinstates exactly the definition, ownership and visibility the
//! class had before. Instances created before or after the stub is installed
//! are affected alike; unrelated classes never are.
//!
//! ## Features
//!
//! - **Explicit runtime** - Classes, single inheritance, per-class method tables with visibility
//! - **Override layers** - A forwarding layer linked ahead of a class, removed on restore
//! - **Faithful restoration** - Owned, inherited and undefined methods each restore correctly
//! - **Two strategies** - Layer-based shims, or in-place overwrite on runtimes without layers
//! - **Scoped teardown** - Sessions restore everything in reverse order, even on panic
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use anystub::prelude::*;
//!
//! let runtime = Arc::new(ClassRegistry::new());
//! let account = ClassBuilder::new("Account")
//!     .method("balance", |_| Ok(Value::Int(100)))
//!     .build(&runtime)?;
//! let instance = runtime.new_instance(account)?;
//!
//! let mut interceptor: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime.clone());
//! interceptor.isolated(|stubs| {
//!     stubs.stub(account, "balance")?;
//!     stubs.mock_for(account).returns("balance", Value::Int(42));
//!     assert_eq!(stubs.runtime().call(instance, "balance", &[], None)?, Value::Int(42));
//!     Ok(())
//! })?;
//!
//! assert_eq!(runtime.call(instance, "balance", &[], None)?, Value::Int(100));
//! # Ok::<(), anystub::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`runtime`] - The class registry the interceptor mutates and dispatches through
//! - [`mock`] - Mock handles that receive forwarded calls
//! - [`stubbing`] - Capture, forwarding and restoration
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade. Shim installation, stubbing and
//! restoration are reported at `debug`, no-op paths at `trace`, individual
//! teardown failures at `warn` and teardown failures during a dropped
//! session at `error`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use anystub::prelude::*;
///
/// let runtime = ClassRegistry::new();
/// let class = ClassBuilder::new("Account").build(&runtime)?;
/// assert_eq!(runtime.name_of(class), "Account");
/// # Ok::<(), anystub::Error>(())
/// ```
pub mod prelude;

/// Class registry, method tables, override layers and dispatch.
///
/// # Key Types
///
/// - [`runtime::ClassRegistry`] - Owns classes and dispatches calls
/// - [`runtime::MethodDef`] - Named method body with a visibility
/// - [`runtime::Value`] - Dynamic values passed to and returned from methods
pub mod runtime;

/// Mock collaborators receiving forwarded calls.
pub mod mock;

/// Any-instance interception.
///
/// See [`stubbing::AnyInstanceInterceptor`] for the entry point.
pub mod stubbing;

/// `anystub` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `anystub` Error type
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use anystub::{runtime::{ClassBuilder, ClassRegistry}, stubbing::AnyInstanceInterceptor, Error};
///
/// let runtime = Arc::new(ClassRegistry::new());
/// let account = ClassBuilder::new("Account").frozen().build(&runtime)?;
///
/// let mut interceptor: AnyInstanceInterceptor = AnyInstanceInterceptor::new(runtime);
/// match interceptor.stub(account, "balance") {
///     Err(Error::NotSupported { class, .. }) => assert_eq!(class, "Account"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// # Ok::<(), anystub::Error>(())
/// ```
pub use error::Error;

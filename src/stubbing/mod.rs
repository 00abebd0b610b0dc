//! Any-instance stubbing.
//!
//! This module replaces the behavior of a method for every instance of a class
//! and later reinstates exactly what was there before. It builds on the
//! override layers and own method tables of [`crate::runtime::ClassRegistry`]
//! and forwards intercepted calls into [`crate::mock`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐  capture/restore  ┌────────────────────────┐
//! │ AnyInstanceInterceptor │──────────────────►│ OriginalMethodRegistry │
//! └───────────┬────────────┘                   └────────────────────────┘
//!             │ install/forward/uninstall
//!             ▼
//! ┌────────────────────────┐  receiver.class() ┌────────────────────────┐
//! │      DispatchShim      │──────────────────►│      MockRegistry      │
//! └────────────────────────┘                   └────────────────────────┘
//! ```
//!
//! # Restoration strategies
//!
//! | Strategy | Forwarder lives in | Restore |
//! |----------|--------------------|---------|
//! | [`RestoreStrategy::Shim`] | the class's override layer | remove the layer entry, write back any owned original |
//! | [`RestoreStrategy::Overwrite`] | the class's own table | write back the original, then reapply its visibility |
//!
//! The strategy is chosen once per interceptor from the runtime's
//! [`crate::runtime::Capabilities`] unless forced through
//! [`InterceptorConfig`].
//!
//! # Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | `interceptor` | [`AnyInstanceInterceptor`] and [`StubState`] |
//! | `original` | [`OriginalMethodRecord`] capture and restoration |
//! | `shim` | [`DispatchShim`] and the shared [`forwarder`] body |
//! | [`probe`] | Visibility and ownership probes |
//! | `session` | [`StubSession`] scoped teardown |

mod config;
mod interceptor;
mod original;
pub mod probe;
mod session;
mod shim;
mod strategy;

pub use config::InterceptorConfig;
pub use interceptor::{AnyInstanceInterceptor, StubState};
pub use original::{OriginalMethodRecord, OriginalMethodRegistry};
pub use session::StubSession;
pub use shim::{forwarder, DispatchShim};
pub use strategy::RestoreStrategy;

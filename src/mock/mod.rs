//! Mock collaborator.
//!
//! The interceptor forwards every intercepted call to a [`MockHandle`] looked
//! up in a [`MockRegistry`] by the receiver's class. [`Mock`] is the handle
//! used unless another implementation is plugged in.
//!
//! # Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | `handle` | [`MockHandle`] trait and [`StubTarget`] |
//! | `double` | [`Mock`] with canned [`Response`]s and an [`Invocation`] log |
//! | `registry` | [`MockRegistry`] keyed by class identity |

mod double;
mod handle;
mod registry;

pub use double::{AnswerFn, Invocation, Mock, Response};
pub use handle::{MockHandle, StubTarget};
pub use registry::MockRegistry;

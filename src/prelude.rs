//! # anystub Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits of the library. Import it to get quick access to everything a
//! test needs to define classes, stub them and configure mocks.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all anystub operations
pub use crate::Error;

/// The result type used throughout anystub
pub use crate::Result;

// ================================================================================================
// Runtime
// ================================================================================================

/// Class registry and class definition
pub use crate::runtime::{ClassBuilder, ClassFlags, ClassId, ClassRegistry, RuntimeConfig};

/// Methods, values and call context
pub use crate::runtime::{Block, CallContext, Instance, MethodDef, Value, Visibility};

// ================================================================================================
// Mocks
// ================================================================================================

/// Mock handles and their registry
pub use crate::mock::{Mock, MockHandle, MockRegistry, Response};

// ================================================================================================
// Stubbing
// ================================================================================================

/// Any-instance interception
pub use crate::stubbing::{
    AnyInstanceInterceptor, InterceptorConfig, RestoreStrategy, StubSession, StubState,
};

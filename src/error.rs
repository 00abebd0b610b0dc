use thiserror::Error;

use crate::runtime::{ClassId, Visibility};

/// Builds an [`Error::Raised`] from a message, mirroring an exception raised
/// by a method body or a mock.
///
/// ```rust, ignore
/// return Err(raised!("balance is locked for {}", account));
/// ```
macro_rules! raised {
    ($msg:expr) => {
        crate::Error::Raised($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Raised(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Interception Errors
/// - [`Error::NotSupported`] - The target class cannot host a dispatch shim
/// - [`Error::AlreadyRestored`] - A stub was released twice (tolerated by `unstub`)
/// - [`Error::VisibilityMismatch`] - Restored visibility differs from the captured one
/// - [`Error::Teardown`] - One or more restorations failed during teardown
///
/// ## Runtime Errors
/// - [`Error::ClassNotFound`] - Unknown class identity
/// - [`Error::DuplicateClass`] - A class with that name already exists
/// - [`Error::NoMethod`] - Method lookup failed along the whole resolution chain
/// - [`Error::NotAccessible`] - A non-public method was called from a public call site
/// - [`Error::Raised`] - A method body or mock raised an error
///
/// ## Mock Errors
/// - [`Error::UnexpectedInvocation`] - A mock received a call it was not configured for
///
/// # Examples
///
/// ```rust
/// use anystub::{Error, runtime::Visibility};
///
/// let err = Error::NotAccessible {
///     class: "Account".to_string(),
///     method: "audit".to_string(),
///     visibility: Visibility::Private,
/// };
/// assert_eq!(err.to_string(), "private method 'audit' called for an instance of Account");
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The target class cannot safely host a dispatch shim.
    ///
    /// Raised synchronously by `stub()` when the class is frozen against
    /// structural modification, or when a runtime operation needs a
    /// capability the runtime does not offer. Never retried.
    #[error("Not supported on {class}: {reason}")]
    NotSupported {
        /// Name of the class that rejected the operation
        class: String,
        /// Why the operation was rejected
        reason: String,
    },

    /// A stub was released a second time.
    ///
    /// `unstub` tolerates this and treats it as a no-op; the variant is
    /// only observable through lower-level release paths.
    #[error("Stub for {class}#{method} was already restored")]
    AlreadyRestored {
        /// Name of the stubbed class
        class: String,
        /// The stubbed method
        method: String,
    },

    /// The visibility observed after restoration differs from the captured one.
    ///
    /// This indicates registry corruption and is always reported.
    #[error("Visibility of {class}#{method} is {actual:?} after restore, expected {expected:?}")]
    VisibilityMismatch {
        /// Name of the restored class
        class: String,
        /// The restored method
        method: String,
        /// Visibility captured before stubbing (`None` when undefined)
        expected: Option<Visibility>,
        /// Visibility observed after restoration (`None` when undefined)
        actual: Option<Visibility>,
    },

    /// One or more restorations failed during teardown.
    ///
    /// Teardown keeps going past individual failures; every failure is
    /// collected here in the order it occurred.
    #[error("{} restoration(s) failed during teardown: {}", .0.len(), join_errors(.0))]
    Teardown(Vec<Error>),

    /// The class identity is not known to the registry.
    #[error("Failed to find class in ClassRegistry - {0}")]
    ClassNotFound(ClassId),

    /// A class with this name is already registered.
    #[error("Class {0} is already defined")]
    DuplicateClass(String),

    /// The method is not defined anywhere along the resolution chain.
    #[error("undefined method '{method}' for an instance of {class}")]
    NoMethod {
        /// Name of the receiver's class
        class: String,
        /// The requested method
        method: String,
    },

    /// A protected or private method was called from a public call site.
    #[error("{visibility} method '{method}' called for an instance of {class}")]
    NotAccessible {
        /// Name of the receiver's class
        class: String,
        /// The requested method
        method: String,
        /// The visibility that blocked the call
        visibility: Visibility,
    },

    /// A mock received an invocation it has no response configured for.
    #[error("unexpected invocation: {receiver}.{method}({args} args)")]
    UnexpectedInvocation {
        /// Name of the receiver's class
        receiver: String,
        /// The invoked method
        method: String,
        /// Number of positional arguments passed
        args: usize,
    },

    /// A method body or mock raised an error.
    ///
    /// Propagates unchanged from the callee to the call site.
    #[error("{0}")]
    Raised(String),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

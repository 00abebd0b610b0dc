//! Interceptor configuration.
//!
//! # Example
//!
//! ```rust
//! use anystub::stubbing::{InterceptorConfig, RestoreStrategy};
//!
//! let config = InterceptorConfig::new().with_strategy(RestoreStrategy::Overwrite);
//! assert_eq!(config.strategy, Some(RestoreStrategy::Overwrite));
//! assert!(config.verify_visibility);
//! ```

use crate::stubbing::RestoreStrategy;

/// Configuration of an [`AnyInstanceInterceptor`](crate::stubbing::AnyInstanceInterceptor).
///
/// # Default Values
///
/// | Field | Default |
/// |-------|---------|
/// | `strategy` | `None` (detected from runtime capabilities) |
/// | `verify_visibility` | `true` |
#[derive(Clone, Debug)]
pub struct InterceptorConfig {
    /// Forces a restoration strategy instead of detecting one.
    ///
    /// Forcing [`RestoreStrategy::Shim`] on a runtime without override
    /// layers makes every `stub()` fail with `NotSupported`.
    pub strategy: Option<RestoreStrategy>,

    /// Whether each restoration is checked against the captured visibility.
    ///
    /// A mismatch is reported as `VisibilityMismatch`.
    pub verify_visibility: bool,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        InterceptorConfig {
            strategy: None,
            verify_visibility: true,
        }
    }
}

impl InterceptorConfig {
    /// Creates the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces a restoration strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: RestoreStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Enables or disables post-restore visibility verification
    #[must_use]
    pub fn with_visibility_check(mut self, enabled: bool) -> Self {
        self.verify_visibility = enabled;
        self
    }
}

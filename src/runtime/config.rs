//! Runtime configuration types.
//!
//! [`RuntimeConfig`] describes which structural primitives a
//! [`ClassRegistry`](crate::runtime::ClassRegistry) offers. The interceptor
//! inspects the resulting [`Capabilities`] once, at construction, to pick its
//! restoration strategy.
//!
//! # Presets
//!
//! - [`RuntimeConfig::default()`] - Full runtime with override layers
//! - [`RuntimeConfig::legacy()`] - No override layers; stubs overwrite methods in place
//!
//! # Example
//!
//! ```rust
//! use anystub::runtime::RuntimeConfig;
//!
//! let config = RuntimeConfig::legacy();
//! assert!(!config.capabilities().prepend);
//!
//! let config = RuntimeConfig::new().with_prepend(true);
//! assert!(config.capabilities().prepend);
//! ```

/// Structural primitives a runtime supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// An override layer can be inserted ahead of a class in resolution order
    pub prepend: bool,
}

/// Configuration of a [`ClassRegistry`](crate::runtime::ClassRegistry).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Whether override layers can be linked ahead of a class.
    ///
    /// When disabled, `prepend_layer` fails with `NotSupported` and
    /// interceptors fall back to overwriting methods on the class itself.
    pub prepend: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { prepend: true }
    }
}

impl RuntimeConfig {
    /// Creates the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration of a runtime without override layers
    #[must_use]
    pub fn legacy() -> Self {
        RuntimeConfig { prepend: false }
    }

    /// Enables or disables override layers
    #[must_use]
    pub fn with_prepend(mut self, enabled: bool) -> Self {
        self.prepend = enabled;
        self
    }

    /// Returns the capability set this configuration provides
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            prepend: self.prepend,
        }
    }
}

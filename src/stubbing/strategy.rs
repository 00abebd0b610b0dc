//! Restoration strategy selection.

use strum::Display;

use crate::runtime::Capabilities;

/// How forwarders are installed and originals put back.
///
/// The strategy is chosen once, when an interceptor is constructed, and
/// never changes for the lifetime of that interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RestoreStrategy {
    /// Forwarders live in an override layer linked ahead of the class; the
    /// class's own table is left untouched while stubbed
    Shim,
    /// Forwarders overwrite the method in the class's own table; restoration
    /// writes the captured definition back and reapplies its visibility
    Overwrite,
}

impl RestoreStrategy {
    /// Picks the strategy a runtime with these capabilities supports
    #[must_use]
    pub fn detect(capabilities: Capabilities) -> Self {
        if capabilities.prepend {
            RestoreStrategy::Shim
        } else {
            RestoreStrategy::Overwrite
        }
    }
}

//! Visibility probes.
//!
//! [`determine_visibility`] reads the live method tables, including override
//! layers, so it answers with what a call site would see at that moment.
//! [`defined_visibility`] answers for the program's own definitions only.

use strum::IntoEnumIterator;

use crate::{
    runtime::{ClassId, ClassRegistry, Visibility},
    Result,
};

/// Determines the visibility a method currently resolves with on a class.
///
/// Probes the class's public, then protected, then private method sets
/// (inherited methods included) and returns the first set that contains the
/// name, or `None` when the method is undefined.
///
/// # Errors
///
/// Returns [`crate::Error::ClassNotFound`] if any class on the chain is unknown.
pub fn determine_visibility(
    runtime: &ClassRegistry,
    class: ClassId,
    name: &str,
) -> Result<Option<Visibility>> {
    for visibility in Visibility::iter() {
        if runtime
            .instance_methods(class, visibility, true)?
            .iter()
            .any(|method| method == name)
        {
            return Ok(Some(visibility));
        }
    }
    Ok(None)
}

/// Determines the visibility a method would resolve with if no stub were active.
///
/// Forwarders installed by any interceptor are skipped, so stubbing an
/// ancestor does not change what a subclass reports here. `None` means no
/// real definition exists along the chain.
///
/// # Errors
///
/// Returns [`crate::Error::ClassNotFound`] if any class on the chain is unknown.
pub fn defined_visibility(
    runtime: &ClassRegistry,
    class: ClassId,
    name: &str,
) -> Result<Option<Visibility>> {
    Ok(runtime
        .resolve_defined(class, name)?
        .map(|resolved| resolved.def.visibility))
}

//! Descriptor validation before a run is started.

use std::collections::HashSet;

use crate::components::ComponentDescriptor;
use crate::error::{CosimError, Result};

/// Validate a component list before bridges are constructed.
///
/// Checks:
/// - At least one component is present
/// - No duplicate component names
///
/// Per-kind checks (pin counts, bit widths, routine compilation) happen
/// inside the individual bridge constructors so that every failure shares
/// the same fatal pre-run path.
pub fn validate_components(components: &[ComponentDescriptor]) -> Result<()> {
    if components.is_empty() {
        return Err(CosimError::NoComponents);
    }

    let mut seen = HashSet::new();
    for descriptor in components {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(CosimError::DuplicateComponent {
                name: descriptor.name.clone(),
            });
        }
    }

    Ok(())
}

//! Embedded STU3 core descriptor table
//!
//! Covers the resource and datatype shapes exercised by the round-trip test
//! corpus (Patient, CapabilityStatement, Medication, Observation, Bundle and
//! the complex datatypes they reach). The table is deliberately not the full
//! STU3 surface: types it omits still round-trip through the codec's
//! unmodeled-field side-table, they just come back untyped.

use std::sync::OnceLock;

use crate::registry::InMemoryRegistry;

static CORE: OnceLock<InMemoryRegistry> = OnceLock::new();

/// The embedded STU3 core registry, parsed once on first use.
pub fn core_registry() -> &'static InMemoryRegistry {
    CORE.get_or_init(|| {
        InMemoryRegistry::from_json_str(include_str!("../data/stu3-core.json"))
            .expect("embedded STU3 descriptor table is well-formed")
    })
}

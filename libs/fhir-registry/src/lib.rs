//! Type registry for descriptor-driven FHIR parsing
//!
//! A [`TypeRegistry`] maps a FHIR type name (`"Patient"`, `"HumanName"`,
//! `"CapabilityStatement.Rest"`) to an ordered list of [`FieldDescriptor`]s
//! describing how that type appears on the JSON wire. The codec consumes the
//! registry through the trait; it never hard-codes resource shapes.
//!
//! Registries are built either programmatically through [`RegistryBuilder`]
//! or from a JSON descriptor table (see [`InMemoryRegistry::from_json_str`]).
//! A pre-built table covering the STU3 core types exercised by the test
//! corpus ships embedded in this crate ([`stu3::core_registry`]).

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod stu3;

pub use descriptor::{
    Cardinality, ChoiceVariant, FieldDescriptor, FieldKind, PrimitiveKind, TypeDescriptor, TypeKind,
};
pub use error::{RegistryError, Result};
pub use registry::{InMemoryRegistry, RegistryBuilder, TypeRegistry};

//! Registry construction and lookup

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldKind, TypeDescriptor};
use crate::error::{RegistryError, Result};

/// Read-only provider of field descriptors, keyed by FHIR type name.
///
/// This is the seam between the codec and whatever produced the descriptor
/// tables (an embedded data file, a generator run against the FHIR
/// definitions bundle, a hand-built table in a test). Lookups are pure and
/// the registry is immutable after construction, so implementations are
/// freely shared across threads.
pub trait TypeRegistry: Send + Sync {
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor>;

    fn contains(&self, type_name: &str) -> bool {
        self.descriptor(type_name).is_some()
    }
}

impl<R: TypeRegistry + ?Sized> TypeRegistry for &R {
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        (**self).descriptor(type_name)
    }
}

impl<R: TypeRegistry + ?Sized> TypeRegistry for Arc<R> {
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        (**self).descriptor(type_name)
    }
}

/// On-disk / embedded form of a descriptor table.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorTable {
    types: Vec<TypeDescriptor>,
}

/// Hash-map backed registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl InMemoryRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Load a registry from a JSON descriptor table:
    /// `{"types": [{"name": ..., "kind": ..., "fields": [...]}, ...]}`.
    pub fn from_json_str(data: &str) -> Result<Self> {
        let table: DescriptorTable = serde_json::from_str(data)?;
        let mut builder = RegistryBuilder::default();
        for descriptor in table.types {
            builder = builder.register(descriptor)?;
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl TypeRegistry for InMemoryRegistry {
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }
}

/// Builder for [`InMemoryRegistry`].
///
/// Rejects duplicate type names; referenced-but-missing complex types are
/// deliberately not an error, because the codec treats descriptor-table gaps
/// as open-world data and falls back to raw preservation.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: HashMap<String, TypeDescriptor>,
}

impl RegistryBuilder {
    pub fn register(mut self, descriptor: TypeDescriptor) -> Result<Self> {
        if self.types.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateType(descriptor.name));
        }
        self.types.insert(descriptor.name.clone(), descriptor);
        Ok(self)
    }

    pub fn build(self) -> Result<InMemoryRegistry> {
        for descriptor in self.types.values() {
            let mut keys = HashSet::new();
            for field in &descriptor.fields {
                if !keys.insert(field.json_key()) {
                    return Err(RegistryError::InvalidTable(format!(
                        "duplicate key `{}` on type `{}`",
                        field.json_key(),
                        descriptor.name
                    )));
                }
                if let FieldKind::Choice { variants } = &field.kind {
                    if variants.is_empty() {
                        return Err(RegistryError::InvalidTable(format!(
                            "choice group `{}.{}` has no variants",
                            descriptor.name, field.name
                        )));
                    }
                }
            }
        }
        Ok(InMemoryRegistry { types: self.types })
    }
}

//! Wire-level field descriptors
//!
//! Descriptors capture how a FHIR type is laid out in its JSON
//! representation: the literal object keys, whether a field repeats, and
//! which of the wire shapes (primitive, nested complex type, reference,
//! `[x]` choice group, inline resource) governs its value. They carry no
//! conformance rules — cardinality minimums, bindings and invariants are a
//! validator's business, not the codec's.

use serde::{Deserialize, Serialize};

/// Single vs. ordered-repeated occurrence on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    #[default]
    Single,
    Repeated,
}

/// Lexical family of a FHIR primitive.
///
/// Values are carried as raw JSON scalars end to end, so the kind only
/// drives shape checks and date/time lexical diagnostics. It never causes a
/// value to be re-formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveKind {
    String,
    Boolean,
    Integer,
    UnsignedInt,
    PositiveInt,
    Decimal,
    Date,
    DateTime,
    Instant,
    Time,
    Code,
    Uri,
    Base64Binary,
}

impl PrimitiveKind {
    /// Whether the JSON scalar for this kind is a string (as opposed to a
    /// JSON number or boolean).
    pub fn is_string_shaped(self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Integer
                | PrimitiveKind::UnsignedInt
                | PrimitiveKind::PositiveInt
                | PrimitiveKind::Decimal
        )
    }
}

/// One admissible variant of a `[x]` choice group.
///
/// `suffix` is the capitalized type suffix appended to the group's base name
/// on the wire (`effective` + `DateTime` → `effectiveDateTime`). Declaration
/// order across a group's variants is significant: it is the deterministic
/// tie-break order when more than one variant key is present in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceVariant {
    pub suffix: String,
    pub kind: FieldKind,
}

impl ChoiceVariant {
    pub fn new(suffix: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            suffix: suffix.into(),
            kind,
        }
    }
}

/// The wire shape of a field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// JSON scalar, optionally paired with a `_field` metadata companion.
    Primitive(PrimitiveKind),
    /// Nested object governed by its own descriptor set.
    #[serde(rename_all = "camelCase")]
    Complex { type_name: String },
    /// Unresolved pointer (`reference`/`display`/`identifier`).
    Reference,
    /// `[x]` group: exactly one of the suffixed keys may appear.
    Choice { variants: Vec<ChoiceVariant> },
    /// Inline resource dispatched on its own `resourceType` key
    /// (`contained`, `Bundle.entry.resource`).
    Resource,
}

/// Descriptor for one field of a FHIR type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Logical field name. For choice groups this is the base name without
    /// any type suffix.
    pub name: String,
    /// Wire key, when it differs from `name`. Reserved words such as
    /// `package` need no escaping here: keys are plain strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_key: Option<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, FieldKind::Primitive(kind))
    }

    pub fn complex(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Complex {
                type_name: type_name.into(),
            },
        )
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    pub fn choice(name: impl Into<String>, variants: Vec<ChoiceVariant>) -> Self {
        Self::new(name, FieldKind::Choice { variants })
    }

    pub fn resource(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Resource)
    }

    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            json_key: None,
            cardinality: Cardinality::Single,
            kind,
        }
    }

    /// Mark the field as an order-preserving repeated sequence.
    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// Override the wire key.
    pub fn with_json_key(mut self, key: impl Into<String>) -> Self {
        self.json_key = Some(key.into());
        self
    }

    /// The literal JSON object key for this field. For choice groups this is
    /// the base name; concrete keys come from [`FieldDescriptor::choice_key`].
    pub fn json_key(&self) -> &str {
        self.json_key.as_deref().unwrap_or(&self.name)
    }

    /// Concrete wire key for a choice variant (`effective` + `DateTime` →
    /// `effectiveDateTime`).
    pub fn choice_key(&self, variant: &ChoiceVariant) -> String {
        format!("{}{}", self.json_key(), variant.suffix)
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }
}

/// Whether a type is a resource (dispatchable by `resourceType`) or a
/// reusable complex datatype / backbone element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Resource,
    #[default]
    Complex,
}

/// Ordered field descriptors for one FHIR type.
///
/// Field order is canonical: the encoder emits populated fields in this
/// order, which keeps output deterministic even though FHIR itself does not
/// mandate key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn resource(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Resource,
            fields,
        }
    }

    pub fn complex(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Complex,
            fields,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.kind == TypeKind::Resource
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_key_defaults_to_name() {
        let field = FieldDescriptor::primitive("birthDate", PrimitiveKind::Date);
        assert_eq!(field.json_key(), "birthDate");

        let renamed = field.with_json_key("birth-date");
        assert_eq!(renamed.json_key(), "birth-date");
        assert_eq!(renamed.name, "birthDate");
    }

    #[test]
    fn choice_key_appends_suffix() {
        let field = FieldDescriptor::choice(
            "effective",
            vec![
                ChoiceVariant::new("DateTime", FieldKind::Primitive(PrimitiveKind::DateTime)),
                ChoiceVariant::new(
                    "Period",
                    FieldKind::Complex {
                        type_name: "Period".into(),
                    },
                ),
            ],
        );
        let FieldKind::Choice { variants } = &field.kind else {
            panic!("expected choice kind");
        };
        assert_eq!(field.choice_key(&variants[0]), "effectiveDateTime");
        assert_eq!(field.choice_key(&variants[1]), "effectivePeriod");
    }

    #[test]
    fn descriptor_round_trips_through_serde() {
        let descriptor = TypeDescriptor::complex(
            "Period",
            vec![
                FieldDescriptor::primitive("start", PrimitiveKind::DateTime),
                FieldDescriptor::primitive("end", PrimitiveKind::DateTime),
            ],
        );
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn complex_kind_uses_camel_case_type_name_on_the_wire() {
        let kind: FieldKind =
            serde_json::from_value(serde_json::json!({"complex": {"typeName": "HumanName"}}))
                .unwrap();
        assert_eq!(
            kind,
            FieldKind::Complex {
                type_name: "HumanName".into()
            }
        );
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            serde_json::json!({"complex": {"typeName": "HumanName"}})
        );
    }

    #[test]
    fn reserved_word_keys_are_plain_strings() {
        let field = FieldDescriptor::complex("package", "Medication.Package");
        assert_eq!(field.json_key(), "package");
    }
}

//! Decoded value objects
//!
//! A decoded resource is a tree of [`ComplexValue`]s whose leaves are
//! [`Primitive`]s carrying the raw JSON scalar plus optional `_field`
//! metadata, [`ReferenceValue`]s carrying unresolved pointers, and
//! [`ChoiceSlot`]s for `[x]` groups. Every node keeps an ordered
//! `unmodeled` side-table of raw JSON for keys its descriptor does not
//! cover, which is what makes re-encoding lossless.
//!
//! Instances are plain immutable values: built once by a decode call,
//! read by assertions or the encoder, then dropped.

use serde_json::{Map, Value};

use crate::choice::ChoiceSlot;
use crate::diagnostics::Diagnostic;

const NO_PRIMITIVES: &[Primitive] = &[];
const NO_COMPLEXES: &[ComplexValue] = &[];
const NO_RESOURCES: &[DecodedResource] = &[];

/// A FHIR primitive: raw JSON scalar plus optional element metadata from the
/// parallel `_field` companion key.
///
/// The scalar is kept verbatim, so decimal and date literals re-encode
/// bit-exact. `value` and `element` may each be absent independently; both
/// absent is equivalent to the field being absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Primitive {
    pub value: Option<Value>,
    pub element: Option<ElementMeta>,
}

impl Primitive {
    pub fn new(value: Value) -> Self {
        Self {
            value: Some(value),
            element: None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(Value::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(Value::as_i64)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.element.as_ref().map_or(true, ElementMeta::is_empty)
    }
}

/// Decoded `_field` companion: the `id`/`extension` payload FHIR attaches to
/// primitives. Companion keys outside the Element shape are preserved in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementMeta {
    pub id: Option<String>,
    pub extensions: Vec<ComplexValue>,
    pub extra: Map<String, Value>,
}

impl ElementMeta {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.extensions.is_empty() && self.extra.is_empty()
    }
}

/// Unresolved reference: the `reference` string and companions are carried
/// as-is; [`ReferenceValue::target`] parses the `Type/id` form on demand
/// without ever dereferencing it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceValue {
    pub reference: Primitive,
    pub display: Primitive,
    pub identifier: Option<ComplexValue>,
    pub extra: Map<String, Value>,
}

impl ReferenceValue {
    pub fn reference_str(&self) -> Option<&str> {
        self.reference.as_str()
    }

    /// `#`-fragment pointing at a contained resource, without the `#`.
    pub fn local_id(&self) -> Option<&str> {
        self.reference_str()?.strip_prefix('#')
    }

    pub fn is_local(&self) -> bool {
        self.local_id().is_some()
    }

    /// Parse the `Type/id` tail of a relative or absolute literal reference
    /// (`Patient/123`, `http://host/fhir/Patient/123/_history/2`).
    pub fn target(&self) -> Option<(&str, &str)> {
        let reference = self.reference_str()?;
        if reference.starts_with('#') {
            return None;
        }
        let mut segments: Vec<&str> = reference.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(pos) = segments.iter().position(|s| *s == "_history") {
            segments.truncate(pos);
        }
        let id = segments.pop()?;
        let type_name = segments.pop()?;
        type_name
            .chars()
            .next()
            .filter(char::is_ascii_uppercase)
            .map(|_| (type_name, id))
    }
}

/// One populated field of a decoded node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Primitive(Primitive),
    Primitives(Vec<Primitive>),
    Complex(ComplexValue),
    Complexes(Vec<ComplexValue>),
    Reference(ReferenceValue),
    References(Vec<ReferenceValue>),
    Choice(ChoiceSlot),
    Resource(Box<DecodedResource>),
    Resources(Vec<DecodedResource>),
}

/// Inline resource from a polymorphic container (`contained`,
/// `Bundle.entry.resource`): typed when the registry knows the nested
/// `resourceType`, otherwise the raw JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedResource {
    Typed(ComplexValue),
    Opaque(Value),
}

impl DecodedResource {
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Typed(body) => Some(&body.type_name),
            Self::Opaque(value) => value.get("resourceType").and_then(Value::as_str),
        }
    }

    pub fn as_typed(&self) -> Option<&ComplexValue> {
        match self {
            Self::Typed(body) => Some(body),
            Self::Opaque(_) => None,
        }
    }
}

/// A decoded complex node: fields in descriptor order, keyed by wire key,
/// plus the raw side-table for everything the descriptor didn't cover.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexValue {
    pub type_name: String,
    fields: Vec<(String, FieldValue)>,
    pub unmodeled: Map<String, Value>,
}

impl ComplexValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            unmodeled: Map::new(),
        }
    }

    /// Node for a type the registry has no descriptors for: everything goes
    /// to the side-table, nothing is typed, the round-trip still holds.
    pub fn opaque(type_name: impl Into<String>, object: &Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            unmodeled: object.clone(),
        }
    }

    pub(crate) fn push(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.push((key.into(), value));
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unmodeled.is_empty()
    }

    pub fn primitive(&self, key: &str) -> Option<&Primitive> {
        match self.field(key)? {
            FieldValue::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn primitive_str(&self, key: &str) -> Option<&str> {
        self.primitive(key)?.as_str()
    }

    pub fn primitive_bool(&self, key: &str) -> Option<bool> {
        self.primitive(key)?.as_bool()
    }

    pub fn primitives(&self, key: &str) -> &[Primitive] {
        match self.field(key) {
            Some(FieldValue::Primitives(items)) => items,
            _ => NO_PRIMITIVES,
        }
    }

    pub fn complex(&self, key: &str) -> Option<&ComplexValue> {
        match self.field(key)? {
            FieldValue::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn complexes(&self, key: &str) -> &[ComplexValue] {
        match self.field(key) {
            Some(FieldValue::Complexes(items)) => items,
            _ => NO_COMPLEXES,
        }
    }

    pub fn reference(&self, key: &str) -> Option<&ReferenceValue> {
        match self.field(key)? {
            FieldValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn choice(&self, key: &str) -> Option<&ChoiceSlot> {
        match self.field(key)? {
            FieldValue::Choice(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn resources(&self, key: &str) -> &[DecodedResource] {
        match self.field(key) {
            Some(FieldValue::Resources(items)) => items,
            _ => NO_RESOURCES,
        }
    }

    pub fn resource(&self, key: &str) -> Option<&DecodedResource> {
        match self.field(key)? {
            FieldValue::Resource(r) => Some(r),
            _ => None,
        }
    }
}

/// Root of one decode call: the typed body plus every non-fatal diagnostic
/// the run recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    pub type_name: String,
    pub body: ComplexValue,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourceInstance {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_target_parses_relative_and_absolute() {
        let mut reference = ReferenceValue::default();
        reference.reference = Primitive::new(json!("Patient/example"));
        assert_eq!(reference.target(), Some(("Patient", "example")));
        assert!(!reference.is_local());

        reference.reference = Primitive::new(json!("http://fhir.hl7.org/svc/Patient/pat2"));
        assert_eq!(reference.target(), Some(("Patient", "pat2")));

        reference.reference = Primitive::new(json!("Patient/example/_history/2"));
        assert_eq!(reference.target(), Some(("Patient", "example")));
    }

    #[test]
    fn local_references_have_no_target() {
        let mut reference = ReferenceValue::default();
        reference.reference = Primitive::new(json!("#org1"));
        assert_eq!(reference.target(), None);
        assert_eq!(reference.local_id(), Some("org1"));
    }

    #[test]
    fn primitive_emptiness_accounts_for_metadata() {
        assert!(Primitive::default().is_empty());
        assert!(!Primitive::new(json!("x")).is_empty());

        let meta_only = Primitive {
            value: None,
            element: Some(ElementMeta {
                id: Some("a1".into()),
                ..Default::default()
            }),
        };
        assert!(!meta_only.is_empty());
    }

    #[test]
    fn field_lookup_is_by_wire_key() {
        let mut node = ComplexValue::new("Medication");
        node.push(
            "package",
            FieldValue::Complex(ComplexValue::new("Medication.Package")),
        );
        assert!(node.complex("package").is_some());
        assert!(node.field("Package").is_none());
    }
}

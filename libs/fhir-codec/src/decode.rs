//! Descriptor-driven decode
//!
//! [`Codec`] is the reusable entry point, generic over the registry seam.
//! Each decode call spins up a short-lived [`DecodeRun`] that walks the
//! input object field-by-field under the type's descriptors, accumulating
//! non-fatal diagnostics as it goes. Anything the descriptors don't cover,
//! or that doesn't match its declared shape, is preserved verbatim in the
//! per-node unmodeled side-table so the re-encoded document is always
//! semantically equal to the input.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use osler_registry::{
    ChoiceVariant, FieldDescriptor, FieldKind, PrimitiveKind, TypeDescriptor, TypeRegistry,
};

use crate::choice::ChoiceSlot;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{CodecError, Result};
use crate::instance::{
    ComplexValue, DecodedResource, ElementMeta, FieldValue, Primitive, ReferenceValue,
    ResourceInstance,
};
use crate::lexical;
use crate::path::JsonPath;

/// Bidirectional mapper between FHIR JSON and [`ResourceInstance`]s.
///
/// Stateless apart from the registry reference; calls are pure and safe to
/// issue from many threads at once.
pub struct Codec<R: TypeRegistry> {
    registry: R,
}

impl<R: TypeRegistry> Codec<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Parse and decode a top-level resource document. The document's own
    /// `resourceType` picks the descriptor set.
    pub fn decode_str(&self, input: &str) -> Result<ResourceInstance> {
        let value: Value = serde_json::from_str(input)?;
        self.decode(None, &value)
    }

    /// Decode an already-parsed JSON value. `type_hint` overrides
    /// `resourceType` dispatch, for callers handling nested payloads.
    pub fn decode(&self, type_hint: Option<&str>, value: &Value) -> Result<ResourceInstance> {
        let object = value.as_object().ok_or_else(|| CodecError::ExpectedObject {
            path: "$".to_string(),
        })?;

        let type_name = match type_hint {
            Some(name) => name.to_string(),
            None => object
                .get("resourceType")
                .and_then(Value::as_str)
                .ok_or(CodecError::MissingResourceType)?
                .to_string(),
        };

        let descriptor = self
            .registry
            .descriptor(&type_name)
            .ok_or_else(|| CodecError::UnknownResourceType(type_name.clone()))?;

        let mut run = DecodeRun {
            registry: &self.registry,
            diagnostics: Vec::new(),
        };
        let body = run.decode_object(descriptor, object, &JsonPath::root(&type_name), true);

        Ok(ResourceInstance {
            type_name,
            body,
            diagnostics: run.diagnostics,
        })
    }
}

/// Short-lived state of one decode call.
struct DecodeRun<'a, R: TypeRegistry> {
    registry: &'a R,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, R: TypeRegistry> DecodeRun<'a, R> {
    fn decode_object(
        &mut self,
        descriptor: &TypeDescriptor,
        object: &Map<String, Value>,
        path: &JsonPath,
        is_resource: bool,
    ) -> ComplexValue {
        let mut out = ComplexValue::new(&descriptor.name);
        let mut consumed: HashSet<String> = HashSet::new();
        if is_resource {
            consumed.insert("resourceType".to_string());
        }

        for field in &descriptor.fields {
            match &field.kind {
                FieldKind::Primitive(kind) => {
                    self.decode_primitive_field(field, *kind, object, path, &mut out, &mut consumed)
                }
                FieldKind::Complex { type_name } => self.decode_complex_field(
                    field, type_name, object, path, &mut out, &mut consumed,
                ),
                FieldKind::Reference => {
                    self.decode_reference_field(field, object, path, &mut out, &mut consumed)
                }
                FieldKind::Choice { variants } => {
                    self.decode_choice_field(field, variants, object, path, &mut out, &mut consumed)
                }
                FieldKind::Resource => {
                    self.decode_resource_field(field, object, path, &mut out, &mut consumed)
                }
            }
        }

        for (key, value) in object {
            if !consumed.contains(key.as_str()) {
                debug!(path = %path, key = %key, "retaining unmodeled field");
                out.unmodeled.insert(key.clone(), value.clone());
            }
        }

        out
    }

    fn decode_primitive_field(
        &mut self,
        field: &FieldDescriptor,
        kind: PrimitiveKind,
        object: &Map<String, Value>,
        path: &JsonPath,
        out: &mut ComplexValue,
        consumed: &mut HashSet<String>,
    ) {
        let key = field.json_key();
        let companion_key = format!("_{key}");
        let value = object.get(key);
        let companion = object.get(companion_key.as_str());
        if value.is_none() && companion.is_none() {
            return;
        }

        let field_path = path.key(key);
        let decoded = if field.is_repeated() {
            self.decode_primitive_list(kind, value, companion, &field_path)
                .map(FieldValue::Primitives)
        } else {
            self.decode_primitive_single(kind, value, companion, &field_path)
                .map(FieldValue::Primitive)
        };

        // On mismatch both keys stay unconsumed and survive raw.
        if let Some(decoded) = decoded {
            consumed.insert(key.to_string());
            consumed.insert(companion_key);
            out.push(key, decoded);
        }
    }

    fn decode_primitive_single(
        &mut self,
        kind: PrimitiveKind,
        value: Option<&Value>,
        companion: Option<&Value>,
        path: &JsonPath,
    ) -> Option<Primitive> {
        let decoded_value = match value {
            None => None,
            Some(scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                if !lexical::shape_matches(kind, scalar) {
                    self.mismatch(path, format!("value does not match declared {kind:?} kind"));
                    return None;
                }
                if let Some(problem) = lexical::value_problem(kind, scalar) {
                    self.invalid(path, problem);
                }
                Some(scalar.clone())
            }
            Some(_) => {
                self.mismatch(path, "expected a JSON scalar");
                return None;
            }
        };

        let element = match companion {
            None => None,
            Some(Value::Object(meta)) => Some(self.parse_element_meta(meta, path)),
            Some(_) => {
                self.mismatch(path, "primitive companion must be an object");
                return None;
            }
        };

        Some(Primitive {
            value: decoded_value,
            element,
        })
    }

    fn decode_primitive_list(
        &mut self,
        kind: PrimitiveKind,
        values: Option<&Value>,
        companions: Option<&Value>,
        path: &JsonPath,
    ) -> Option<Vec<Primitive>> {
        let values = match values {
            None => None,
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.mismatch(path, "expected an array for repeated primitive");
                return None;
            }
        };
        let metas = match companions {
            None => None,
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.mismatch(path, "expected an array for primitive companion");
                return None;
            }
        };

        if let (Some(values), Some(metas)) = (values, metas) {
            if values.len() != metas.len() {
                self.mismatch(path, "value and companion arrays differ in length");
                return None;
            }
        }

        let len = values.map_or(0, Vec::len).max(metas.map_or(0, Vec::len));
        if len == 0 {
            self.mismatch(path, "array must not be empty");
            return None;
        }

        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let item_path = path.index(index);

            let decoded_value = match values.and_then(|v| v.get(index)) {
                None | Some(Value::Null) => None,
                Some(scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                    if !lexical::shape_matches(kind, scalar) {
                        self.mismatch(
                            &item_path,
                            format!("value does not match declared {kind:?} kind"),
                        );
                        return None;
                    }
                    if let Some(problem) = lexical::value_problem(kind, scalar) {
                        self.invalid(&item_path, problem);
                    }
                    Some(scalar.clone())
                }
                Some(_) => {
                    self.mismatch(&item_path, "expected a JSON scalar or null");
                    return None;
                }
            };

            let element = match metas.and_then(|m| m.get(index)) {
                None | Some(Value::Null) => None,
                Some(Value::Object(meta)) => Some(self.parse_element_meta(meta, &item_path)),
                Some(_) => {
                    self.mismatch(&item_path, "primitive companion entries must be objects or null");
                    return None;
                }
            };

            items.push(Primitive {
                value: decoded_value,
                element,
            });
        }

        // Arrays of nothing but null placeholders cannot be re-emitted
        // faithfully from the decoded form, so they stay raw instead.
        if items
            .iter()
            .all(|p| p.value.is_none() && p.element.is_none())
        {
            self.mismatch(path, "arrays carry no values or metadata");
            return None;
        }
        Some(items)
    }

    /// Decode a `_field` companion object: `id`, `extension`, and anything
    /// else preserved raw.
    fn parse_element_meta(&mut self, meta: &Map<String, Value>, path: &JsonPath) -> ElementMeta {
        let mut out = ElementMeta::default();
        for (key, value) in meta {
            match (key.as_str(), value) {
                ("id", Value::String(id)) => out.id = Some(id.clone()),
                ("extension", Value::Array(items)) if items.iter().all(Value::is_object) => {
                    let ext_path = path.key("extension");
                    for (index, item) in items.iter().enumerate() {
                        if let Some(object) = item.as_object() {
                            out.extensions.push(self.decode_complex_value(
                                "Extension",
                                object,
                                &ext_path.index(index),
                            ));
                        }
                    }
                }
                _ => {
                    out.extra.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Decode a nested object as `type_name`, falling back to an opaque
    /// raw-preserving node when the registry has no descriptors for it.
    fn decode_complex_value(
        &mut self,
        type_name: &str,
        object: &Map<String, Value>,
        path: &JsonPath,
    ) -> ComplexValue {
        match self.registry.descriptor(type_name) {
            Some(descriptor) if !descriptor.is_resource() => {
                self.decode_object(descriptor, object, path, false)
            }
            _ => {
                debug!(path = %path, type_name = %type_name, "no descriptors; keeping node opaque");
                ComplexValue::opaque(type_name, object)
            }
        }
    }

    fn decode_complex_field(
        &mut self,
        field: &FieldDescriptor,
        type_name: &str,
        object: &Map<String, Value>,
        path: &JsonPath,
        out: &mut ComplexValue,
        consumed: &mut HashSet<String>,
    ) {
        let key = field.json_key();
        let Some(value) = object.get(key) else {
            return;
        };
        let field_path = path.key(key);

        if field.is_repeated() {
            let Some(objects) = as_object_array(value) else {
                self.mismatch(&field_path, "expected a non-empty array of objects");
                return;
            };
            let decoded = objects
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    self.decode_complex_value(type_name, item, &field_path.index(index))
                })
                .collect();
            consumed.insert(key.to_string());
            out.push(key, FieldValue::Complexes(decoded));
        } else {
            let Some(item) = value.as_object() else {
                self.mismatch(&field_path, "expected an object");
                return;
            };
            let decoded = self.decode_complex_value(type_name, item, &field_path);
            consumed.insert(key.to_string());
            out.push(key, FieldValue::Complex(decoded));
        }
    }

    fn decode_reference_field(
        &mut self,
        field: &FieldDescriptor,
        object: &Map<String, Value>,
        path: &JsonPath,
        out: &mut ComplexValue,
        consumed: &mut HashSet<String>,
    ) {
        let key = field.json_key();
        let Some(value) = object.get(key) else {
            return;
        };
        let field_path = path.key(key);

        if field.is_repeated() {
            let Some(objects) = as_object_array(value) else {
                self.mismatch(&field_path, "expected a non-empty array of objects");
                return;
            };
            let decoded = objects
                .iter()
                .enumerate()
                .map(|(index, item)| self.parse_reference(item, &field_path.index(index)))
                .collect();
            consumed.insert(key.to_string());
            out.push(key, FieldValue::References(decoded));
        } else {
            let Some(item) = value.as_object() else {
                self.mismatch(&field_path, "expected an object");
                return;
            };
            let decoded = self.parse_reference(item, &field_path);
            consumed.insert(key.to_string());
            out.push(key, FieldValue::Reference(decoded));
        }
    }

    /// Split a Reference object into its known parts without resolving
    /// anything; unknown keys ride along raw.
    fn parse_reference(&mut self, object: &Map<String, Value>, path: &JsonPath) -> ReferenceValue {
        let mut out = ReferenceValue::default();
        for (key, value) in object {
            match (key.as_str(), value) {
                ("reference", Value::String(_)) => out.reference.value = Some(value.clone()),
                ("_reference", Value::Object(meta)) => {
                    out.reference.element = Some(self.parse_element_meta(meta, path))
                }
                ("display", Value::String(_)) => out.display.value = Some(value.clone()),
                ("_display", Value::Object(meta)) => {
                    out.display.element = Some(self.parse_element_meta(meta, path))
                }
                ("identifier", Value::Object(identifier)) => {
                    out.identifier = Some(self.decode_complex_value(
                        "Identifier",
                        identifier,
                        &path.key("identifier"),
                    ))
                }
                _ => {
                    out.extra.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    fn decode_choice_field(
        &mut self,
        field: &FieldDescriptor,
        variants: &[ChoiceVariant],
        object: &Map<String, Value>,
        path: &JsonPath,
        out: &mut ComplexValue,
        consumed: &mut HashSet<String>,
    ) {
        let mut slot = ChoiceSlot::new();

        for variant in variants {
            let key = field.choice_key(variant);
            let companion_key = format!("_{key}");
            let is_primitive = matches!(variant.kind, FieldKind::Primitive(_));
            let present = object.contains_key(key.as_str())
                || (is_primitive && object.contains_key(companion_key.as_str()));
            if !present {
                continue;
            }
            let variant_path = path.key(&key);

            if slot.is_resolved() {
                // Later variants lose deterministically; their raw keys stay
                // in the side-table so nothing is dropped.
                let message = format!(
                    "choice group `{}` already resolved to `{}`; `{key}` kept raw",
                    field.json_key(),
                    slot.suffix().unwrap_or_default(),
                );
                let diagnostic =
                    Diagnostic::new(DiagnosticKind::AmbiguousChoice, &variant_path, message);
                debug!(diagnostic = %diagnostic, "ambiguous choice");
                self.diagnostics.push(diagnostic);
                continue;
            }

            let decoded = match &variant.kind {
                FieldKind::Primitive(kind) => self
                    .decode_primitive_single(
                        *kind,
                        object.get(key.as_str()),
                        object.get(companion_key.as_str()),
                        &variant_path,
                    )
                    .map(FieldValue::Primitive),
                FieldKind::Complex { type_name } => match object.get(key.as_str()) {
                    Some(Value::Object(item)) => Some(FieldValue::Complex(
                        self.decode_complex_value(type_name, item, &variant_path),
                    )),
                    _ => {
                        self.mismatch(&variant_path, "expected an object");
                        None
                    }
                },
                FieldKind::Reference => match object.get(key.as_str()) {
                    Some(Value::Object(item)) => Some(FieldValue::Reference(
                        self.parse_reference(item, &variant_path),
                    )),
                    _ => {
                        self.mismatch(&variant_path, "expected an object");
                        None
                    }
                },
                FieldKind::Choice { .. } | FieldKind::Resource => {
                    self.mismatch(&variant_path, "unsupported choice variant kind");
                    None
                }
            };

            if let Some(value) = decoded {
                consumed.insert(key);
                if is_primitive {
                    consumed.insert(companion_key);
                }
                // Cannot conflict: the slot was checked above.
                let _ = slot.resolve(variant.suffix.clone(), value);
            }
        }

        if slot.is_resolved() {
            out.push(field.json_key(), FieldValue::Choice(slot));
        }
    }

    fn decode_resource_field(
        &mut self,
        field: &FieldDescriptor,
        object: &Map<String, Value>,
        path: &JsonPath,
        out: &mut ComplexValue,
        consumed: &mut HashSet<String>,
    ) {
        let key = field.json_key();
        let Some(value) = object.get(key) else {
            return;
        };
        let field_path = path.key(key);

        if field.is_repeated() {
            let Some(objects) = as_object_array(value) else {
                self.mismatch(&field_path, "expected a non-empty array of objects");
                return;
            };
            let decoded = objects
                .iter()
                .enumerate()
                .map(|(index, item)| self.decode_resource_value(item, &field_path.index(index)))
                .collect();
            consumed.insert(key.to_string());
            out.push(key, FieldValue::Resources(decoded));
        } else {
            let Some(item) = value.as_object() else {
                self.mismatch(&field_path, "expected an object");
                return;
            };
            let decoded = self.decode_resource_value(item, &field_path);
            consumed.insert(key.to_string());
            out.push(key, FieldValue::Resource(Box::new(decoded)));
        }
    }

    /// Open dispatch over inline resources: known `resourceType`s decode
    /// with their own descriptors, everything else is carried opaquely.
    fn decode_resource_value(
        &mut self,
        object: &Map<String, Value>,
        path: &JsonPath,
    ) -> DecodedResource {
        let Some(type_name) = object.get("resourceType").and_then(Value::as_str) else {
            self.mismatch(path, "inline resource is missing resourceType");
            return DecodedResource::Opaque(Value::Object(object.clone()));
        };

        match self.registry.descriptor(type_name) {
            Some(descriptor) if descriptor.is_resource() => {
                DecodedResource::Typed(self.decode_object(descriptor, object, path, true))
            }
            _ => {
                debug!(path = %path, type_name = %type_name, "unknown inline resource type; keeping opaque");
                DecodedResource::Opaque(Value::Object(object.clone()))
            }
        }
    }

    fn mismatch(&mut self, path: &JsonPath, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(DiagnosticKind::FieldTypeMismatch, path, message);
        debug!(diagnostic = %diagnostic, "field type mismatch");
        self.diagnostics.push(diagnostic);
    }

    fn invalid(&mut self, path: &JsonPath, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(DiagnosticKind::InvalidPrimitive, path, message);
        debug!(diagnostic = %diagnostic, "invalid primitive");
        self.diagnostics.push(diagnostic);
    }
}

/// Non-empty array of objects, or `None`.
fn as_object_array(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items.iter().map(Value::as_object).collect()
}

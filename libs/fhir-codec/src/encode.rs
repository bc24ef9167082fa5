//! Instance-to-JSON encode
//!
//! Encoding never consults the registry: every node already carries its
//! fields in descriptor order under their wire keys, with raw unmodeled
//! JSON appended after them. That makes `encode(decode(j))` semantically
//! equal to `j` by construction.

use serde_json::{Map, Value};

use osler_registry::TypeRegistry;

use crate::choice::ChoiceSlot;
use crate::decode::Codec;
use crate::error::Result;
use crate::instance::{
    ComplexValue, DecodedResource, ElementMeta, FieldValue, Primitive, ReferenceValue,
    ResourceInstance,
};

impl<R: TypeRegistry> Codec<R> {
    pub fn encode(&self, instance: &ResourceInstance) -> Value {
        encode_resource(instance)
    }

    pub fn encode_string(&self, instance: &ResourceInstance) -> Result<String> {
        Ok(serde_json::to_string(&encode_resource(instance))?)
    }

    pub fn encode_string_pretty(&self, instance: &ResourceInstance) -> Result<String> {
        Ok(serde_json::to_string_pretty(&encode_resource(instance))?)
    }
}

/// Serialize a decoded resource back to its JSON document,
/// `resourceType` first.
pub fn encode_resource(instance: &ResourceInstance) -> Value {
    encode_resource_body(&instance.type_name, &instance.body)
}

fn encode_resource_body(type_name: &str, body: &ComplexValue) -> Value {
    let mut map = Map::new();
    map.insert(
        "resourceType".to_string(),
        Value::String(type_name.to_string()),
    );
    encode_fields_into(body, &mut map);
    Value::Object(map)
}

fn encode_fields_into(body: &ComplexValue, map: &mut Map<String, Value>) {
    for (key, value) in body.fields() {
        encode_field(map, key, value);
    }
    for (key, value) in &body.unmodeled {
        map.insert(key.clone(), value.clone());
    }
}

fn encode_field(map: &mut Map<String, Value>, key: &str, value: &FieldValue) {
    match value {
        FieldValue::Primitive(primitive) => encode_primitive(map, key, primitive),
        FieldValue::Primitives(items) => encode_primitive_list(map, key, items),
        FieldValue::Complex(complex) => {
            map.insert(key.to_string(), encode_complex(complex));
        }
        FieldValue::Complexes(items) => {
            map.insert(
                key.to_string(),
                Value::Array(items.iter().map(encode_complex).collect()),
            );
        }
        FieldValue::Reference(reference) => {
            map.insert(key.to_string(), encode_reference(reference));
        }
        FieldValue::References(items) => {
            map.insert(
                key.to_string(),
                Value::Array(items.iter().map(encode_reference).collect()),
            );
        }
        FieldValue::Choice(slot) => {
            // The stored key is the choice base; the wire key re-attaches the
            // winning type suffix.
            if let ChoiceSlot::Resolved { suffix, value } = slot {
                let wire_key = format!("{key}{suffix}");
                encode_field(map, &wire_key, value);
            }
        }
        FieldValue::Resource(resource) => {
            map.insert(key.to_string(), encode_decoded_resource(resource));
        }
        FieldValue::Resources(items) => {
            map.insert(
                key.to_string(),
                Value::Array(items.iter().map(encode_decoded_resource).collect()),
            );
        }
    }
}

fn encode_primitive(map: &mut Map<String, Value>, key: &str, primitive: &Primitive) {
    if let Some(value) = &primitive.value {
        map.insert(key.to_string(), value.clone());
    }
    // `element` is only populated when a `_key` companion was present in the
    // input, so it is re-emitted even when its payload is empty.
    if let Some(element) = &primitive.element {
        map.insert(format!("_{key}"), encode_element_meta(element));
    }
}

/// Repeated primitives re-split into the parallel value and `_key` arrays,
/// with `null` padding keeping the two index-aligned. An array is emitted
/// only when at least one of its entries was present in the input.
fn encode_primitive_list(map: &mut Map<String, Value>, key: &str, items: &[Primitive]) {
    let has_values = items.iter().any(|p| p.value.is_some());
    let has_metas = items.iter().any(|p| p.element.is_some());

    if has_values {
        let values = items
            .iter()
            .map(|p| p.value.clone().unwrap_or(Value::Null))
            .collect();
        map.insert(key.to_string(), Value::Array(values));
    }
    if has_metas {
        let metas = items
            .iter()
            .map(|p| match &p.element {
                Some(element) => encode_element_meta(element),
                None => Value::Null,
            })
            .collect();
        map.insert(format!("_{key}"), Value::Array(metas));
    }
}

fn encode_element_meta(element: &ElementMeta) -> Value {
    let mut map = Map::new();
    if let Some(id) = &element.id {
        map.insert("id".to_string(), Value::String(id.clone()));
    }
    if !element.extensions.is_empty() {
        map.insert(
            "extension".to_string(),
            Value::Array(element.extensions.iter().map(encode_complex).collect()),
        );
    }
    for (key, value) in &element.extra {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

fn encode_complex(complex: &ComplexValue) -> Value {
    let mut map = Map::new();
    encode_fields_into(complex, &mut map);
    Value::Object(map)
}

fn encode_reference(reference: &ReferenceValue) -> Value {
    let mut map = Map::new();
    encode_primitive(&mut map, "reference", &reference.reference);
    encode_primitive(&mut map, "display", &reference.display);
    if let Some(identifier) = &reference.identifier {
        map.insert("identifier".to_string(), encode_complex(identifier));
    }
    for (key, value) in &reference.extra {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

fn encode_decoded_resource(resource: &DecodedResource) -> Value {
    match resource {
        DecodedResource::Typed(body) => encode_resource_body(&body.type_name, body),
        DecodedResource::Opaque(value) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ResourceInstance;
    use serde_json::json;

    fn instance(body: ComplexValue) -> ResourceInstance {
        ResourceInstance {
            type_name: body.type_name.clone(),
            body,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn resource_type_is_emitted_first() {
        let mut body = ComplexValue::new("Patient");
        body.push("active", FieldValue::Primitive(Primitive::new(json!(true))));

        let encoded = encode_resource(&instance(body));
        let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["resourceType", "active"]);
    }

    #[test]
    fn companion_only_primitive_emits_only_underscore_key() {
        let mut body = ComplexValue::new("Patient");
        body.push(
            "gender",
            FieldValue::Primitive(Primitive {
                value: None,
                element: Some(ElementMeta {
                    id: Some("g1".into()),
                    ..Default::default()
                }),
            }),
        );

        let encoded = encode_resource(&instance(body));
        assert_eq!(encoded.get("gender"), None);
        assert_eq!(encoded["_gender"], json!({"id": "g1"}));
    }

    #[test]
    fn repeated_primitives_null_pad_both_arrays() {
        let mut body = ComplexValue::new("Patient");
        body.push(
            "given",
            FieldValue::Primitives(vec![
                Primitive::new(json!("Peter")),
                Primitive {
                    value: None,
                    element: Some(ElementMeta {
                        id: Some("g2".into()),
                        ..Default::default()
                    }),
                },
            ]),
        );

        let encoded = encode_resource(&instance(body));
        assert_eq!(encoded["given"], json!(["Peter", null]));
        assert_eq!(encoded["_given"], json!([null, {"id": "g2"}]));
    }

    #[test]
    fn choice_key_restores_type_suffix() {
        let mut slot = ChoiceSlot::new();
        slot.resolve(
            "DateTime",
            FieldValue::Primitive(Primitive::new(json!("2013-04-02T09:30:10+01:00"))),
        )
        .unwrap();

        let mut body = ComplexValue::new("Observation");
        body.push("effective", FieldValue::Choice(slot));

        let encoded = encode_resource(&instance(body));
        assert_eq!(encoded["effectiveDateTime"], json!("2013-04-02T09:30:10+01:00"));
        assert_eq!(encoded.get("effective"), None);
    }

    #[test]
    fn unmodeled_fields_are_replayed_verbatim() {
        let mut body = ComplexValue::new("Patient");
        body.push("active", FieldValue::Primitive(Primitive::new(json!(true))));
        body.unmodeled
            .insert("favouriteColour".to_string(), json!({"hue": 180}));

        let encoded = encode_resource(&instance(body));
        assert_eq!(encoded["favouriteColour"], json!({"hue": 180}));
    }

    #[test]
    fn opaque_resources_round_trip_bitwise() {
        let raw = json!({"resourceType": "Organization", "name": "ACME", "x": [1, 2]});
        let mut body = ComplexValue::new("Patient");
        body.push(
            "contained",
            FieldValue::Resources(vec![DecodedResource::Opaque(raw.clone())]),
        );

        let encoded = encode_resource(&instance(body));
        assert_eq!(encoded["contained"], json!([raw]));
    }
}

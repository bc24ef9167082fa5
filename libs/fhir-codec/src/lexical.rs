//! Primitive shape and lexical checks
//!
//! Two layers, with different consequences in the decoder:
//! - `shape_matches` compares the JSON value class against the declared
//!   kind; a failure is a `FieldTypeMismatch` and the value stays raw.
//! - `value_problem` checks ranges and FHIR's partial-precision date/time
//!   grammars; a failure is only an `InvalidPrimitive` diagnostic and the
//!   value is decoded unchanged.

use std::sync::OnceLock;

use osler_registry::PrimitiveKind;
use regex::Regex;
use serde_json::Value;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").expect("valid regex"))
}

// Time, when present, requires seconds and a timezone offset.
fn date_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}(-\d{2}(-\d{2}(T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2}))?)?)?$")
            .expect("valid regex")
    })
}

fn instant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
            .expect("valid regex")
    })
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").expect("valid regex"))
}

/// Does the JSON value class agree with the declared primitive kind?
pub(crate) fn shape_matches(kind: PrimitiveKind, value: &Value) -> bool {
    match kind {
        PrimitiveKind::Boolean => value.is_boolean(),
        PrimitiveKind::Integer | PrimitiveKind::UnsignedInt | PrimitiveKind::PositiveInt => {
            value.as_i64().is_some() || value.as_u64().is_some()
        }
        PrimitiveKind::Decimal => value.is_number(),
        _ => value.is_string(),
    }
}

/// Range/lexical problem with a shape-correct value, if any.
pub(crate) fn value_problem(kind: PrimitiveKind, value: &Value) -> Option<String> {
    match kind {
        PrimitiveKind::UnsignedInt => {
            let n = value.as_i64()?;
            (n < 0).then(|| format!("unsignedInt must be >= 0, got {n}"))
        }
        PrimitiveKind::PositiveInt => {
            let n = value.as_i64()?;
            (n < 1).then(|| format!("positiveInt must be >= 1, got {n}"))
        }
        PrimitiveKind::Date => lexical(value, date_re(), "date"),
        PrimitiveKind::DateTime => lexical(value, date_time_re(), "dateTime"),
        PrimitiveKind::Instant => lexical(value, instant_re(), "instant"),
        PrimitiveKind::Time => lexical(value, time_re(), "time"),
        _ => None,
    }
}

fn lexical(value: &Value, re: &Regex, kind_name: &str) -> Option<String> {
    let s = value.as_str()?;
    (!re.is_match(s)).then(|| format!("{s:?} is not a valid FHIR {kind_name}"))
}

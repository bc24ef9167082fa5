//! Choice-group slot
//!
//! FHIR's `[x]` convention allows exactly one of several suffixed keys per
//! logical field. The slot makes that a structural fact: it starts `Unset`,
//! transitions once to `Resolved`, and refuses further transitions. The
//! decoder turns a refused transition into an `AmbiguousChoice` diagnostic.

use crate::instance::FieldValue;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChoiceSlot {
    #[default]
    Unset,
    Resolved {
        /// Capitalized type suffix of the winning variant (`DateTime` in
        /// `effectiveDateTime`).
        suffix: String,
        value: Box<FieldValue>,
    },
}

/// Rejected second transition of a [`ChoiceSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceConflict {
    pub existing: String,
    pub rejected: String,
}

impl ChoiceSlot {
    pub fn new() -> Self {
        Self::Unset
    }

    /// Resolve the slot to `suffix`. Fails if a variant already won.
    pub fn resolve(
        &mut self,
        suffix: impl Into<String>,
        value: FieldValue,
    ) -> Result<(), ChoiceConflict> {
        match self {
            Self::Unset => {
                *self = Self::Resolved {
                    suffix: suffix.into(),
                    value: Box::new(value),
                };
                Ok(())
            }
            Self::Resolved { suffix: existing, .. } => Err(ChoiceConflict {
                existing: existing.clone(),
                rejected: suffix.into(),
            }),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn suffix(&self) -> Option<&str> {
        match self {
            Self::Resolved { suffix, .. } => Some(suffix),
            Self::Unset => None,
        }
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            Self::Resolved { value, .. } => Some(value),
            Self::Unset => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Primitive;
    use serde_json::json;

    #[test]
    fn resolves_once() {
        let mut slot = ChoiceSlot::new();
        assert!(!slot.is_resolved());

        slot.resolve("DateTime", FieldValue::Primitive(Primitive::new(json!("2013-04-02"))))
            .unwrap();
        assert!(slot.is_resolved());
        assert_eq!(slot.suffix(), Some("DateTime"));
    }

    #[test]
    fn second_resolution_is_a_conflict() {
        let mut slot = ChoiceSlot::new();
        slot.resolve("Boolean", FieldValue::Primitive(Primitive::new(json!(true))))
            .unwrap();

        let err = slot
            .resolve("DateTime", FieldValue::Primitive(Primitive::new(json!("2013"))))
            .unwrap_err();
        assert_eq!(err.existing, "Boolean");
        assert_eq!(err.rejected, "DateTime");

        // The first resolution is untouched.
        assert_eq!(slot.suffix(), Some("Boolean"));
    }
}

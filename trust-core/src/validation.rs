//! Record validation.
//!
//! Schema validation is a black-box predicate to the engines: a record of a
//! given kind is either accepted or rejected with a list of violations.

use serde_json::Value;

/// Kinds of records submitted for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Entropy node registration descriptor
    Node,
    /// Signal initiation
    Signal,
    /// Ritual execution
    Ritual,
}

/// Accepts or rejects a structured record.
pub trait RecordValidator: Send + Sync {
    /// Returns the list of violations when the record is rejected.
    fn validate(&self, kind: SchemaKind, record: &Value) -> Result<(), Vec<String>>;
}

/// Checks that the required top-level fields of each record kind are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    fn required_fields(kind: SchemaKind) -> &'static [&'static str] {
        match kind {
            SchemaKind::Node => &["wallet_address", "entropy_agent", "roles", "identity_proof"],
            SchemaKind::Signal => &["initiator", "signal_type", "payload"],
            SchemaKind::Ritual => &["initiator", "actions"],
        }
    }
}

impl RecordValidator for StructuralValidator {
    fn validate(&self, kind: SchemaKind, record: &Value) -> Result<(), Vec<String>> {
        let Some(object) = record.as_object() else {
            return Err(vec![format!("{:?} record must be an object", kind)]);
        };

        let violations: Vec<String> = Self::required_fields(kind)
            .iter()
            .filter_map(|field| match object.get(*field) {
                None | Some(Value::Null) => Some(format!("missing field '{}'", field)),
                Some(Value::String(s)) if s.trim().is_empty() => {
                    Some(format!("field '{}' must not be empty", field))
                }
                _ => None,
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Validator that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RecordValidator for AcceptAll {
    fn validate(&self, _kind: SchemaKind, _record: &Value) -> Result<(), Vec<String>> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signal_record_accepted() {
        let record = json!({
            "initiator": "agentA",
            "signal_type": "oracle-update",
            "payload": {"val": 1}
        });
        assert!(StructuralValidator.validate(SchemaKind::Signal, &record).is_ok());
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let record = json!({
            "initiator": "  ",
            "payload": null
        });
        let violations = StructuralValidator
            .validate(SchemaKind::Signal, &record)
            .unwrap_err();

        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.contains("initiator")));
        assert!(violations.iter().any(|v| v.contains("signal_type")));
    }

    #[test]
    fn test_non_object_rejected() {
        let result = StructuralValidator.validate(SchemaKind::Ritual, &json!([1, 2]));
        assert!(result.is_err());
        assert!(AcceptAll.validate(SchemaKind::Ritual, &json!([1, 2])).is_ok());
    }
}

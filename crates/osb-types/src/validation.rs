//! Request field validation
//!
//! Violations are collected into a `FieldErrors` list so a single response
//! can report every problem with a request at once.

use std::fmt;

/// A single invalid field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path, e.g. `instance_id`
    pub field: String,
    /// The offending value
    pub value: String,
    /// What the value should have been
    pub detail: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Invalid value: {:?}: {}",
            self.field, self.value, self.detail
        )
    }
}

/// An aggregate of field violations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Append every violation from `other`
    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok` when nothing was collected
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => Ok(()),
            [only] => write!(f, "{}", only),
            many => {
                f.write_str("[")?;
                for (i, err) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl std::error::Error for FieldErrors {}

/// Length of the hyphenated `8-4-4-4-12` form
const HYPHENATED_UUID_LEN: usize = 36;

/// Check that `value` is a UUID in hyphenated form.
///
/// The simple, braced and URN spellings are rejected: ids name stored
/// instances verbatim, so one UUID must have exactly one spelling.
pub fn validate_uuid(field: &str, value: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if value.len() != HYPHENATED_UUID_LEN || uuid::Uuid::try_parse(value).is_err() {
        errors.push(FieldError {
            field: field.to_string(),
            value: value.to_string(),
            detail: "must be a valid UUID".to_string(),
        });
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uuid_passes() {
        let errors = validate_uuid("instance_id", "0b1f3c5e-8c43-4a1b-9d3e-2f7a6e1c0d44");
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_invalid_uuid_reports_field() {
        let errors = validate_uuid("instance_id", "abc-123");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.to_string(),
            r#"instance_id: Invalid value: "abc-123": must be a valid UUID"#
        );
    }

    #[test]
    fn test_only_hyphenated_form_passes() {
        for value in [
            "0b1f3c5e8c434a1b9d3e2f7a6e1c0d44",
            "{0b1f3c5e-8c43-4a1b-9d3e-2f7a6e1c0d44}",
            "urn:uuid:0b1f3c5e-8c43-4a1b-9d3e-2f7a6e1c0d44",
            "0b1f3c5e-8c43-4a1b-9d3e-2f7a6e1c0d4g",
        ] {
            assert_eq!(validate_uuid("instance_id", value).len(), 1, "{}", value);
        }
        assert!(validate_uuid("instance_id", "0B1F3C5E-8C43-4A1B-9D3E-2F7A6E1C0D44").is_empty());
    }

    #[test]
    fn test_aggregate_lists_every_violation() {
        let mut errors = validate_uuid("instance_id", "nope");
        errors.extend(validate_uuid("binding_id", "also-nope"));
        assert_eq!(errors.len(), 2);

        let msg = errors.to_string();
        assert!(msg.starts_with('['));
        assert!(msg.contains("instance_id"));
        assert!(msg.contains("binding_id"));
        assert!(errors.into_result().is_err());
    }
}

//! Helpers for collecting field violations into a single `ValidationErrors` set.
//!
//! Bounds are declared with `#[derive(Validate)]` on the input types; presence
//! checks are added by hand so a single report lists every broken rule.

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Accumulator for validation failures of one input value.
#[derive(Debug)]
pub struct Violations {
    errors: ValidationErrors,
}

impl Violations {
    pub fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    /// Starts from the outcome of a derived `Validate::validate` call.
    pub fn from_derived(result: Result<(), ValidationErrors>) -> Self {
        match result {
            Ok(()) => Self::new(),
            Err(errors) => Self { errors },
        }
    }

    /// Records a violation on `field`.
    pub fn add(&mut self, field: &'static str, code: &'static str, message: &'static str) {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));
        self.errors.add(field, error);
    }

    /// A required text field must be present and not blank.
    pub fn require_text(&mut self, field: &'static str, value: Option<&str>, message: &'static str) {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.add(field, "required", message);
        }
    }

    /// A text field that was supplied must not be blank.
    pub fn reject_blank(&mut self, field: &'static str, value: Option<&str>, message: &'static str) {
        if value.is_some_and(|v| v.trim().is_empty()) {
            self.add(field, "required", message);
        }
    }

    /// A required non-text field must be present.
    pub fn require<T>(&mut self, field: &'static str, value: Option<&T>, message: &'static str) {
        if value.is_none() {
            self.add(field, "required", message);
        }
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// A single `field: message` pair extracted from a `ValidationErrors` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Flattens field-level errors, sorted by field then message so the output is stable.
pub fn flatten(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut out = Vec::new();
    for (field, kind) in errors.errors() {
        if let ValidationErrorsKind::Field(list) = kind {
            for error in list {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.push(FieldViolation {
                    field: field.to_string(),
                    message,
                });
            }
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

/// All violation messages, in the same order as [`flatten`].
pub fn messages(errors: &ValidationErrors) -> Vec<String> {
    flatten(errors).into_iter().map(|v| v.message).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_violations_is_ok() {
        assert!(Violations::new().into_result().is_ok());
    }

    #[test]
    fn test_require_text_rejects_missing_and_blank() {
        let mut v = Violations::new();
        v.require_text("a", None, "a missing");
        v.require_text("b", Some("   "), "b blank");
        v.require_text("c", Some("ok"), "c never");
        let errors = v.into_result().unwrap_err();
        assert_eq!(messages(&errors), vec!["a missing", "b blank"]);
    }

    #[test]
    fn test_reject_blank_ignores_absent() {
        let mut v = Violations::new();
        v.reject_blank("a", None, "never");
        v.reject_blank("b", Some(""), "b blank");
        let errors = v.into_result().unwrap_err();
        let flat = flatten(&errors);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].field, "b");
    }

    #[test]
    fn test_multiple_errors_on_one_field_are_kept() {
        let mut v = Violations::new();
        v.add("name", "x", "second");
        v.add("name", "y", "first");
        let errors = v.into_result().unwrap_err();
        assert_eq!(messages(&errors), vec!["first", "second"]);
    }
}

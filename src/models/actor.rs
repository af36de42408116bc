use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

use super::validation::Violations;

const NAME_REQUIRED: &str = "name must not be null";
const GENDER_REQUIRED: &str = "gender must not be null";
const BIRTH_DATE_REQUIRED: &str = "date of birth must not be null";

/// A stored actor together with the ids of the movies they appear in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub gender: String,
    #[schema(value_type = String, format = Date, example = "1964-09-02")]
    pub date_of_birth: Date,
    /// Ids of movies the actor appears in, ascending.
    pub movies: Vec<i32>,
}

/// Actor payload for create and partial update requests.
///
/// Every field is optional so an update can tell "not supplied" apart from a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActorInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date, example = "1964-09-02")]
    pub date_of_birth: Option<Date>,
}

impl ActorInput {
    /// Checks a create payload: every field is required.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut violations = Violations::new();
        violations.require_text("name", self.name.as_deref(), NAME_REQUIRED);
        violations.require_text("gender", self.gender.as_deref(), GENDER_REQUIRED);
        violations.require("date_of_birth", self.date_of_birth.as_ref(), BIRTH_DATE_REQUIRED);
        violations.into_result()
    }

    /// Checks an update payload: only supplied fields are inspected.
    pub fn check_patch(&self) -> Result<(), ValidationErrors> {
        let mut violations = Violations::new();
        violations.reject_blank("name", self.name.as_deref(), NAME_REQUIRED);
        violations.reject_blank("gender", self.gender.as_deref(), GENDER_REQUIRED);
        violations.into_result()
    }

    /// True when the payload carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.gender.is_none() && self.date_of_birth.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validation::messages;
    use jiff::civil::date;

    fn full() -> ActorInput {
        ActorInput {
            name: Some("Keanu Reeves".to_string()),
            gender: Some("male".to_string()),
            date_of_birth: Some(date(1964, 9, 2)),
        }
    }

    #[test]
    fn test_complete_actor_passes() {
        assert!(full().check().is_ok());
    }

    #[test]
    fn test_empty_actor_reports_every_missing_field() {
        let errors = ActorInput::default().check().unwrap_err();
        let mut got = messages(&errors);
        got.sort();
        assert_eq!(
            got,
            vec![BIRTH_DATE_REQUIRED, GENDER_REQUIRED, NAME_REQUIRED]
        );
    }

    #[test]
    fn test_missing_birth_date_only() {
        let input = ActorInput {
            date_of_birth: None,
            ..full()
        };
        let errors = input.check().unwrap_err();
        assert_eq!(messages(&errors), vec![BIRTH_DATE_REQUIRED]);
    }

    #[test]
    fn test_patch_accepts_partial_payload() {
        let input = ActorInput {
            gender: Some("female".to_string()),
            ..ActorInput::default()
        };
        assert!(input.check_patch().is_ok());
        assert!(input.check().is_err());
    }

    #[test]
    fn test_patch_rejects_supplied_blank_name() {
        let input = ActorInput {
            name: Some(String::new()),
            ..ActorInput::default()
        };
        let errors = input.check_patch().unwrap_err();
        assert_eq!(messages(&errors), vec![NAME_REQUIRED]);
    }

    #[test]
    fn test_input_deserializes_iso_date() {
        let input: ActorInput =
            serde_json::from_str(r#"{"name":"A","gender":"f","date_of_birth":"1990-01-31"}"#)
                .unwrap();
        assert_eq!(input.date_of_birth, Some(date(1990, 1, 31)));
    }
}

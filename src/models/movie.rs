use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::validation::Violations;

const NAME_REQUIRED: &str = "name must not be null";
const DESCRIPTION_REQUIRED: &str = "description must not be null";
const RELEASE_DATE_REQUIRED: &str = "date of release must not be null";
const RATING_REQUIRED: &str = "rating must not be null";

/// A stored movie together with the ids of its actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Movie {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, format = Date, example = "1999-03-31")]
    pub release_date: Date,
    pub rating: i32,
    /// Ids of participating actors, ascending.
    pub actors: Vec<i32>,
}

/// Movie payload for create and partial update requests.
///
/// `actors: None` means "leave the cast alone"; `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct MovieInput {
    #[serde(default)]
    #[validate(length(max = 150, message = "movie name must be less than 150 chars"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "movie description must be less than 1000 chars"))]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date, example = "1999-03-31")]
    pub release_date: Option<Date>,
    #[serde(default)]
    #[validate(range(min = 0, max = 10, message = "rating must be in range 0 - 10"))]
    pub rating: Option<i32>,
    #[serde(default)]
    pub actors: Option<Vec<i32>>,
}

impl MovieInput {
    /// Checks a create payload: all scalar fields are required and bounded.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut violations = Violations::from_derived(self.validate());
        violations.require_text("name", self.name.as_deref(), NAME_REQUIRED);
        violations.require_text("description", self.description.as_deref(), DESCRIPTION_REQUIRED);
        violations.require("release_date", self.release_date.as_ref(), RELEASE_DATE_REQUIRED);
        violations.require("rating", self.rating.as_ref(), RATING_REQUIRED);
        violations.into_result()
    }

    /// Checks an update payload: bounds and non-blankness of supplied fields only.
    pub fn check_patch(&self) -> Result<(), ValidationErrors> {
        let mut violations = Violations::from_derived(self.validate());
        violations.reject_blank("name", self.name.as_deref(), NAME_REQUIRED);
        violations.reject_blank("description", self.description.as_deref(), DESCRIPTION_REQUIRED);
        violations.into_result()
    }

    /// True when no scalar column would change.
    pub fn has_scalar_changes(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.release_date.is_some()
            || self.rating.is_some()
    }

    /// Supplied actor ids, ascending and without duplicates.
    pub fn actor_ids(&self) -> Option<Vec<i32>> {
        self.actors.as_ref().map(|ids| {
            let mut ids = ids.clone();
            ids.sort_unstable();
            ids.dedup();
            ids
        })
    }
}

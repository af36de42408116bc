use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Ordering applied to movie listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
pub enum MovieSort {
    /// Rating, highest first.
    #[default]
    Rating,
    /// Name, alphabetical.
    Name,
    /// Release date, oldest first.
    ReleaseDate,
}

impl MovieSort {
    /// Maps the `sort` query value; anything unrecognized falls back to rating.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("name") => MovieSort::Name,
            Some("release") => MovieSort::ReleaseDate,
            _ => MovieSort::Rating,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovieSort::Rating => "rating",
            MovieSort::Name => "name",
            MovieSort::ReleaseDate => "release",
        }
    }
}

impl std::fmt::Display for MovieSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string of `GET /movies`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovieListQuery {
    /// One of `name`, `release`, `rating` (default).
    pub sort: Option<String>,
}

impl MovieListQuery {
    pub fn sort(&self) -> MovieSort {
        MovieSort::from_query(self.sort.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(MovieSort::from_query(Some("name")), MovieSort::Name);
        assert_eq!(MovieSort::from_query(Some("release")), MovieSort::ReleaseDate);
        assert_eq!(MovieSort::from_query(Some("rating")), MovieSort::Rating);
    }

    #[test]
    fn test_missing_and_unknown_fall_back_to_rating() {
        assert_eq!(MovieSort::from_query(None), MovieSort::Rating);
        assert_eq!(MovieSort::from_query(Some("popularity")), MovieSort::Rating);
        assert_eq!(MovieSort::from_query(Some("")), MovieSort::Rating);
    }

    #[test]
    fn test_query_struct() {
        let query = MovieListQuery {
            sort: Some("release".to_string()),
        };
        assert_eq!(query.sort(), MovieSort::ReleaseDate);
        assert_eq!(MovieListQuery::default().sort(), MovieSort::Rating);
    }
}

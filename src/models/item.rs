use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{CatalogEntry, Rating, Status};

/// A row of the `movies`, `series` or `books` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryItem {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub status_id: i32,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "genre_list")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub total_seasons: Option<u32>,
    #[serde(default)]
    pub current_season: Option<u32>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LibraryItem {
    pub fn status(&self) -> Option<Status> {
        Status::from_id(self.status_id)
    }

    pub fn is_pending(&self) -> bool {
        self.status_id == Status::Pending.id()
    }

    /// Stored rating, if it is a valid half-star value
    pub fn rating(&self) -> Option<Rating> {
        self.rating.and_then(|value| Rating::new(value).ok())
    }

    /// Percentage of seasons watched, for series with a known season count
    pub fn season_progress(&self) -> Option<f32> {
        let total = self.total_seasons.filter(|t| *t > 0)?;
        let current = self.current_season.unwrap_or(1);
        Some(current.min(total) as f32 / total as f32 * 100.0)
    }
}

/// Insert payload for a new library item
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NewItem {
    pub title: String,
    pub status_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_seasons: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl NewItem {
    /// A bare item with no catalog metadata
    pub fn titled(title: impl Into<String>, status: Status) -> Self {
        Self {
            title: title.into(),
            status_id: status.id(),
            ..Default::default()
        }
    }

    /// Copies catalog metadata onto the item, keeping the item's own title
    pub fn with_metadata(mut self, entry: &CatalogEntry) -> Self {
        self.year = entry.year;
        self.poster_path = entry.poster_path.clone();
        self.overview = entry.overview.clone();
        self.genres = entry.genres.clone();
        self.tmdb_id = entry.tmdb_id();
        self.director = entry.director.clone();
        self.total_seasons = entry.total_seasons;
        if entry.total_seasons.is_some() {
            self.current_season = Some(1);
        }
        self.author = entry.author.clone();
        self.isbn = entry.isbn.clone();
        self.total_pages = entry.total_pages;
        self
    }
}

/// Partial update for an existing item
///
/// `rating` is double-optional: `Some(None)` writes a SQL null.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Option<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_season: Option<u32>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.status_id.is_none() && self.rating.is_none() && self.current_season.is_none()
    }
}

/// Deserializes any JSON value into a string, mapping non-strings to ""
///
/// Upstream rows are free text from third parties; one odd field must not
/// reject the whole record.
pub fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

/// Same as [`lenient_string`] but keeps absence distinguishable
pub fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// Accepts a JSON array, a JSON-encoded array inside a string, or a
/// comma-separated string
fn genre_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_genres(value))
}

pub(crate) fn parse_genres(value: serde_json::Value) -> Vec<String> {
    use serde_json::Value;

    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Object(mut map) => match map.remove("name") {
                    Some(Value::String(s)) => Some(s),
                    _ => None,
                },
                _ => None,
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(inner) = serde_json::from_str::<Value>(trimmed) {
                    return parse_genres(inner);
                }
            }
            trimmed
                .split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect()
        }
        _ => Vec::new(),
    }
}

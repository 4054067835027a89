use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Kind of media tracked in the library
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Book,
}

impl MediaKind {
    /// Store table holding items of this kind
    pub fn table(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Series => "series",
            MediaKind::Book => "books",
        }
    }

    /// Plural noun used in user-facing messages
    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Series => "series",
            MediaKind::Book => "books",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
            MediaKind::Book => write!(f, "book"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "series" | "tv" | "show" => Ok(MediaKind::Series),
            "book" | "books" => Ok(MediaKind::Book),
            other => Err(AppError::InvalidInput(format!("Unknown media kind '{}'", other))),
        }
    }
}

/// Watch/read status of a library item
///
/// The numeric ids match the rows of the `statuses` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Pending = 1,
    Watched = 2,
    Watching = 3,
    Favorite = 4,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Watched,
        Status::Watching,
        Status::Favorite,
    ];

    pub fn id(&self) -> i32 {
        *self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.id() == id)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Watched => "Watched",
            Status::Watching => "Watching",
            Status::Favorite => "Favorite",
        }
    }

    /// Description for a raw status id, "Unknown" when it maps to nothing
    pub fn describe_id(id: i32) -> &'static str {
        Self::from_id(id).map(|s| s.description()).unwrap_or("Unknown")
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if let Ok(id) = normalized.parse::<i32>() {
            return Self::from_id(id)
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown status id {}", id)));
        }
        match normalized.as_str() {
            "pending" | "pendiente" => Ok(Status::Pending),
            "watched" | "read" | "vista" => Ok(Status::Watched),
            "watching" | "reading" => Ok(Status::Watching),
            "favorite" | "favourite" => Ok(Status::Favorite),
            other => Err(AppError::InvalidInput(format!("Unknown status '{}'", other))),
        }
    }
}

/// Half-star rating between 0.5 and 5
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rating(f32);

impl Rating {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 5.0;

    pub fn new(value: f32) -> Result<Self, AppError> {
        let doubled = value * 2.0;
        if !(Self::MIN..=Self::MAX).contains(&value) || doubled.fract() != 0.0 {
            return Err(AppError::InvalidInput(format!(
                "Rating must be a multiple of 0.5 between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Descriptive label for the rating
    pub fn label(&self) -> &'static str {
        match (self.0 * 2.0) as u8 {
            1 => "½ - Terrible",
            2 => "1 - Very Bad",
            3 => "1.5 - Bad",
            4 => "2 - Poor",
            5 => "2.5 - Fair",
            6 => "3 - Good",
            7 => "3.5 - Very Good",
            8 => "4 - Excellent",
            9 => "4.5 - Almost Perfect",
            _ => "5 - Perfect ✨",
        }
    }

    /// Five-character star bar, `½` marking a half star
    pub fn stars(&self) -> String {
        let full = self.0.floor() as usize;
        let half = self.0.fract() > 0.0;
        let mut bar = "★".repeat(full);
        if half {
            bar.push('½');
        }
        let used = full + usize::from(half);
        bar.push_str(&"☆".repeat(5 - used));
        bar
    }
}

impl FromStr for Rating {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f32>()
            .map_err(|_| AppError::InvalidInput(format!("Invalid rating '{}'", s)))?;
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f32::deserialize(deserializer)?;
        Rating::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_parse() {
        assert_eq!("Movie".parse::<MediaKind>().unwrap(), MediaKind::Movie);
        assert_eq!("tv".parse::<MediaKind>().unwrap(), MediaKind::Series);
        assert_eq!("books".parse::<MediaKind>().unwrap(), MediaKind::Book);
        assert!("podcast".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_media_kind_table() {
        assert_eq!(MediaKind::Movie.table(), "movies");
        assert_eq!(MediaKind::Series.table(), "series");
        assert_eq!(MediaKind::Book.table(), "books");
    }

    #[test]
    fn test_status_ids_round_trip() {
        for status in Status::ALL {
            assert_eq!(Status::from_id(status.id()), Some(status));
        }
        assert_eq!(Status::from_id(9), None);
        assert_eq!(Status::describe_id(9), "Unknown");
        assert_eq!(Status::describe_id(2), "Watched");
    }

    #[test]
    fn test_status_parse_accepts_legacy_names() {
        assert_eq!("vista".parse::<Status>().unwrap(), Status::Watched);
        assert_eq!("Pendiente".parse::<Status>().unwrap(), Status::Pending);
        assert_eq!("4".parse::<Status>().unwrap(), Status::Favorite);
        assert!("7".parse::<Status>().is_err());
    }

    #[test]
    fn test_rating_validation() {
        assert!(Rating::new(0.5).is_ok());
        assert!(Rating::new(5.0).is_ok());
        assert!(Rating::new(3.5).is_ok());
        assert!(Rating::new(0.0).is_err());
        assert!(Rating::new(5.5).is_err());
        assert!(Rating::new(2.3).is_err());
    }

    #[test]
    fn test_rating_labels() {
        assert_eq!(Rating::new(0.5).unwrap().label(), "½ - Terrible");
        assert_eq!(Rating::new(3.0).unwrap().label(), "3 - Good");
        assert_eq!(Rating::new(5.0).unwrap().label(), "5 - Perfect ✨");
    }

    #[test]
    fn test_rating_stars() {
        assert_eq!(Rating::new(3.5).unwrap().stars(), "★★★½☆");
        assert_eq!(Rating::new(5.0).unwrap().stars(), "★★★★★");
        assert_eq!(Rating::new(0.5).unwrap().stars(), "½☆☆☆☆");
    }

    #[test]
    fn test_rating_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("4.5").is_ok());
        assert!(serde_json::from_str::<Rating>("7").is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::item::{lenient_opt_string, lenient_string, parse_genres};
use super::MediaKind;
use crate::services::matching::Titled;

/// Identifier of an entry in an external catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogId {
    /// TMDB numeric id (movies and tv share the scheme but not the namespace)
    Tmdb(i64),
    /// OpenLibrary key (e.g., "/works/OL45883W")
    OpenLibrary(String),
}

impl Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogId::Tmdb(id) => write!(f, "tmdb:{}", id),
            CatalogId::OpenLibrary(key) => write!(f, "ol:{}", key),
        }
    }
}

/// A catalog search result in the shape every media kind shares
///
/// Providers adapt their upstream response into this before anything else
/// looks at it, so the resolver only ever sees plain titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub kind: MediaKind,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    /// TMDB poster path for screen media, full cover URL for books
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub total_seasons: Option<u32>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_pages: Option<u32>,
    /// Position in the upstream result list
    pub search_index: usize,
}

impl CatalogEntry {
    pub fn new(id: CatalogId, kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            original_title: None,
            year: None,
            poster_path: None,
            overview: None,
            genres: Vec::new(),
            director: None,
            total_seasons: None,
            author: None,
            isbn: None,
            total_pages: None,
            search_index: 0,
        }
    }

    pub fn tmdb_id(&self) -> Option<i64> {
        match self.id {
            CatalogId::Tmdb(id) => Some(id),
            CatalogId::OpenLibrary(_) => None,
        }
    }
}

impl Titled for CatalogEntry {
    fn primary_title(&self) -> &str {
        &self.title
    }

    fn secondary_title(&self) -> Option<&str> {
        self.original_title.as_deref()
    }
}

/// Leading four-digit year of an ISO-ish date ("2010-07-16" → 2010)
pub fn year_from_date(date: &str) -> Option<i32> {
    let head: String = date.trim().chars().take(4).collect();
    if head.len() == 4 && head.chars().all(|c| c.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie result from `/search/movie`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieResult {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub original_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl TmdbMovieResult {
    pub fn into_entry(self, search_index: usize) -> CatalogEntry {
        let mut entry = CatalogEntry::new(CatalogId::Tmdb(self.id), MediaKind::Movie, self.title);
        entry.original_title = non_empty(self.original_title);
        entry.year = self.release_date.as_deref().and_then(year_from_date);
        entry.poster_path = non_empty(self.poster_path);
        entry.overview = non_empty(self.overview);
        entry.search_index = search_index;
        entry
    }
}

/// TV result from `/search/tv`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTvResult {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub original_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl TmdbTvResult {
    pub fn into_entry(self, search_index: usize) -> CatalogEntry {
        let mut entry = CatalogEntry::new(CatalogId::Tmdb(self.id), MediaKind::Series, self.name);
        entry.original_title = non_empty(self.original_name);
        entry.year = self.first_air_date.as_deref().and_then(year_from_date);
        entry.poster_path = non_empty(self.poster_path);
        entry.overview = non_empty(self.overview);
        entry.search_index = search_index;
        entry
    }
}

/// Response from `/movie/{id}?append_to_response=credits`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    #[serde(default)]
    pub genres: serde_json::Value,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

impl TmdbMovieDetails {
    pub fn director(&self) -> Option<String> {
        self.credits
            .as_ref()?
            .crew
            .iter()
            .find(|member| member.job == "Director")
            .map(|member| member.name.clone())
    }

    /// Fills the gaps of a search entry with detail fields
    pub fn enrich(self, mut entry: CatalogEntry) -> CatalogEntry {
        entry.director = self.director();
        entry.genres = parse_genres(self.genres);
        if let Some(overview) = non_empty(self.overview) {
            entry.overview = Some(overview);
        }
        if entry.poster_path.is_none() {
            entry.poster_path = non_empty(self.poster_path);
        }
        entry
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    #[serde(default, deserialize_with = "lenient_string")]
    pub job: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

/// Response from `/tv/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTvDetails {
    pub id: i64,
    #[serde(default)]
    pub genres: serde_json::Value,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
}

impl TmdbTvDetails {
    pub fn enrich(self, mut entry: CatalogEntry) -> CatalogEntry {
        entry.genres = parse_genres(self.genres);
        entry.total_seasons = self.number_of_seasons;
        if let Some(overview) = non_empty(self.overview) {
            entry.overview = Some(overview);
        }
        if entry.poster_path.is_none() {
            entry.poster_path = non_empty(self.poster_path);
        }
        entry
    }
}

// ============================================================================
// OpenLibrary API Types
// ============================================================================

/// Document from `/search.json`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenLibraryDoc {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub author_name: Option<Vec<String>>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    /// Either a list of dates or a single date string
    #[serde(default)]
    pub publish_date: serde_json::Value,
    #[serde(default)]
    pub isbn: Option<Vec<String>>,
    #[serde(default)]
    pub number_of_pages_median: Option<u32>,
    #[serde(default)]
    pub subject: Option<Vec<String>>,
    #[serde(default, alias = "cover_id")]
    pub cover_i: Option<i64>,
}

impl OpenLibraryDoc {
    pub fn authors(&self) -> String {
        match &self.author_name {
            Some(names) if !names.is_empty() => names.join(", "),
            _ => "Unknown Author".to_string(),
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.first_publish_year.or_else(|| {
            let date = match &self.publish_date {
                serde_json::Value::String(s) => Some(s.as_str()),
                serde_json::Value::Array(dates) => dates.first().and_then(|d| d.as_str()),
                _ => None,
            }?;
            publish_year(date)
        })
    }

    /// Identity of the document, synthesized when OpenLibrary omits the key
    pub fn catalog_key(&self) -> String {
        self.key.clone().unwrap_or_else(|| {
            let author = self
                .author_name
                .as_ref()
                .and_then(|names| names.first())
                .map(String::as_str)
                .unwrap_or("unknown");
            format!("{}-{}", self.title, author)
        })
    }
}

/// Edition record from `/api/books?jscmd=data`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenLibraryEdition {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<OpenLibraryNamed>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub number_of_pages: Option<u32>,
    #[serde(default)]
    pub subjects: Vec<OpenLibraryNamed>,
    #[serde(default)]
    pub cover: Option<OpenLibraryCover>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenLibraryNamed {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenLibraryCover {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// Year of an OpenLibrary publish date ("1950", "1950-06-08", "June 1950")
pub fn publish_year(date: &str) -> Option<i32> {
    let head = date.split('-').next().unwrap_or(date);
    year_from_date(head).or_else(|| {
        date.split(|c: char| !c.is_ascii_digit())
            .find(|part| part.len() == 4)
            .and_then(|part| part.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_year_from_date() {
        assert_eq!(year_from_date("2010-07-16"), Some(2010));
        assert_eq!(year_from_date(""), None);
        assert_eq!(year_from_date("n/a"), None);
    }

    #[test]
    fn test_publish_year_variants() {
        assert_eq!(publish_year("1950"), Some(1950));
        assert_eq!(publish_year("1950-06-08"), Some(1950));
        assert_eq!(publish_year("June 1950"), Some(1950));
        assert_eq!(publish_year("unknown"), None);
    }

    #[test]
    fn test_movie_result_into_entry() {
        let result: TmdbMovieResult = serde_json::from_value(json!({
            "id": 27205,
            "title": "Origen",
            "original_title": "Inception",
            "release_date": "2010-07-15",
            "poster_path": "/inception.jpg",
            "overview": ""
        }))
        .unwrap();

        let entry = result.into_entry(2);
        assert_eq!(entry.id, CatalogId::Tmdb(27205));
        assert_eq!(entry.kind, MediaKind::Movie);
        assert_eq!(entry.primary_title(), "Origen");
        assert_eq!(entry.secondary_title(), Some("Inception"));
        assert_eq!(entry.year, Some(2010));
        assert_eq!(entry.overview, None);
        assert_eq!(entry.search_index, 2);
    }

    #[test]
    fn test_tv_result_uses_name_fields() {
        let result: TmdbTvResult = serde_json::from_value(json!({
            "id": 1396,
            "name": "Breaking Bad",
            "original_name": "Breaking Bad",
            "first_air_date": "2008-01-20"
        }))
        .unwrap();

        let entry = result.into_entry(0);
        assert_eq!(entry.kind, MediaKind::Series);
        assert_eq!(entry.title, "Breaking Bad");
        assert_eq!(entry.year, Some(2008));
    }

    #[test]
    fn test_malformed_title_becomes_empty() {
        let result: TmdbMovieResult =
            serde_json::from_value(json!({"id": 1, "title": null, "original_title": 7})).unwrap();
        assert_eq!(result.title, "");
        assert_eq!(result.original_title, None);
    }

    #[test]
    fn test_movie_details_enrich() {
        let details: TmdbMovieDetails = serde_json::from_value(json!({
            "id": 27205,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "overview": "A thief who steals corporate secrets...",
            "credits": {"crew": [
                {"job": "Producer", "name": "Emma Thomas"},
                {"job": "Director", "name": "Christopher Nolan"}
            ]}
        }))
        .unwrap();

        let entry = details.enrich(CatalogEntry::new(
            CatalogId::Tmdb(27205),
            MediaKind::Movie,
            "Inception",
        ));
        assert_eq!(entry.director.as_deref(), Some("Christopher Nolan"));
        assert_eq!(entry.genres, vec!["Action", "Science Fiction"]);
        assert!(entry.overview.is_some());
    }

    #[test]
    fn test_tv_details_enrich() {
        let details: TmdbTvDetails = serde_json::from_value(json!({
            "id": 1396,
            "genres": [{"id": 18, "name": "Drama"}],
            "number_of_seasons": 5
        }))
        .unwrap();

        let entry = details.enrich(CatalogEntry::new(
            CatalogId::Tmdb(1396),
            MediaKind::Series,
            "Breaking Bad",
        ));
        assert_eq!(entry.total_seasons, Some(5));
        assert_eq!(entry.genres, vec!["Drama"]);
    }

    #[test]
    fn test_openlibrary_doc_helpers() {
        let doc: OpenLibraryDoc = serde_json::from_value(json!({
            "title": "1984",
            "author_name": ["George Orwell"],
            "publish_date": ["June 1949", "1950"],
        }))
        .unwrap();

        assert_eq!(doc.authors(), "George Orwell");
        assert_eq!(doc.year(), Some(1949));
        assert_eq!(doc.catalog_key(), "1984-George Orwell");
    }

    #[test]
    fn test_openlibrary_doc_without_authors() {
        let doc: OpenLibraryDoc = serde_json::from_value(json!({"title": "Anonymous"})).unwrap();
        assert_eq!(doc.authors(), "Unknown Author");
        assert_eq!(doc.year(), None);
    }

    #[test]
    fn test_catalog_id_display() {
        assert_eq!(CatalogId::Tmdb(5).to_string(), "tmdb:5");
        assert_eq!(
            CatalogId::OpenLibrary("/works/OL1W".to_string()).to_string(),
            "ol:/works/OL1W"
        );
    }
}

use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Supabase project URL (the PostgREST API lives under `/rest/v1`)
    pub supabase_url: String,

    /// Supabase anonymous API key
    pub supabase_anon_key: String,

    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,

    /// Prefix prepended to TMDB poster paths
    #[serde(default = "default_tmdb_image_base_url")]
    pub tmdb_image_base_url: String,

    /// Language requested from TMDB searches
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// OpenLibrary API base URL
    #[serde(default = "default_openlibrary_url")]
    pub openlibrary_url: String,

    /// OpenLibrary covers base URL
    #[serde(default = "default_openlibrary_covers_url")]
    pub openlibrary_covers_url: String,

    /// Redis connection URL. Catalog searches are not cached when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Shared access token that unlocks write commands
    #[serde(default)]
    pub access_token: Option<String>,

    /// Where the session token is persisted between invocations
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Items per page in list views
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_tmdb_language() -> String {
    "es-ES".to_string()
}

fn default_openlibrary_url() -> String {
    "https://openlibrary.org".to_string()
}

fn default_openlibrary_covers_url() -> String {
    "https://covers.openlibrary.org".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".watchlog-session.json")
}

fn default_page_size() -> usize {
    20
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would only fail later at request time
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.supabase_url.trim().is_empty() || self.supabase_anon_key.trim().is_empty() {
            anyhow::bail!("Missing Supabase configuration. Check your .env file");
        }
        if self.tmdb_api_key.trim().is_empty() {
            anyhow::bail!("Missing TMDB API key. Check your .env file");
        }
        if self.page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be at least 1");
        }
        Ok(())
    }

    /// Full poster URL for a stored poster path
    ///
    /// TMDB stores bare paths; book covers are already absolute URLs.
    pub fn poster_url(&self, poster_path: Option<&str>) -> Option<String> {
        poster_path.map(|path| {
            if path.starts_with("http://") || path.starts_with("https://") {
                path.to_string()
            } else {
                format!("{}{}", self.tmdb_image_base_url, path)
            }
        })
    }
}

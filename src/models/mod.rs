pub mod catalog;
pub mod item;
pub mod media;

pub use catalog::{
    CatalogEntry, CatalogId, OpenLibraryDoc, OpenLibraryEdition, TmdbMovieDetails,
    TmdbMovieResult, TmdbTvDetails, TmdbTvResult,
};
pub use item::{ItemUpdate, LibraryItem, NewItem};
pub use media::{MediaKind, Rating, Status};

use serde::Deserialize;

/// Row of the read-only `statuses` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StatusRow {
    pub id: i32,
    pub description: String,
}

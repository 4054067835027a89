pub mod catalog;
pub mod export;
pub mod filters;
pub mod library;
pub mod matching;
pub mod providers;

pub use catalog::CatalogService;
pub use library::{ImportReport, LibraryService};
pub use matching::{find_best_match, Candidate, Titled};

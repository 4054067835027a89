//! Command line front end
//!
//! Argument parsing with clap and one handler per subcommand. Handlers write
//! their output to the given writer; diagnostics go through `tracing`.
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

use crate::{
    auth::Session,
    config::Config,
    error::{AppError, AppResult},
    models::{CatalogEntry, LibraryItem, MediaKind, Rating, Status},
    services::{
        export::ExportFormat,
        filters::{paginate, relative_time, ItemFilter, LibraryStats},
        library::LibraryService,
        matching,
        providers::{openlibrary::DEFAULT_SEARCH_LIMIT, OpenLibraryProvider},
    },
};

/// Personal tracker for movies, series and books
#[derive(Debug, Parser)]
#[command(name = "watchlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SearchBy {
    #[default]
    Title,
    Author,
    Isbn,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search the catalog (TMDB for movies and series, OpenLibrary for books)
    Search {
        kind: MediaKind,
        query: String,

        /// Search field; author and isbn apply to books only
        #[arg(long, value_enum, default_value_t = SearchBy::Title)]
        by: SearchBy,
    },

    /// Add a title, filling in catalog metadata when a match is found
    Add {
        kind: MediaKind,
        title: String,

        #[arg(short, long, default_value = "pending")]
        status: Status,
    },

    /// List library items
    List {
        kind: MediaKind,

        #[arg(short, long)]
        status: Option<Status>,

        /// Text matched against title, year, director and author
        #[arg(long)]
        search: Option<String>,

        /// Only items rated at least this much
        #[arg(long, default_value_t = 0.0)]
        min_rating: f32,

        #[arg(short, long)]
        genre: Option<String>,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Show counts per status and the average rating
    Stats { kind: MediaKind },

    /// Change the status of an item
    Status {
        kind: MediaKind,
        id: i64,
        status: Status,
    },

    /// Rate a watched item (0.5 to 5 in half steps)
    Rate {
        kind: MediaKind,
        id: i64,
        rating: Rating,
    },

    /// Set the season a series is at
    Season { id: i64, season: u32 },

    /// Delete an item
    Delete { kind: MediaKind, id: i64 },

    /// Import `Title,Status` lines from a file
    Import { kind: MediaKind, file: PathBuf },

    /// Export the library as CSV or JSON
    Export {
        kind: MediaKind,

        #[arg(value_enum)]
        format: ExportFormat,

        /// Output path (defaults to watchlog-YYYY-MM-DD.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Store an access token for write commands
    Login { token: String },

    /// Forget the stored access token
    Logout,
}

impl Commands {
    /// Whether the command modifies the library
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Commands::Add { .. }
                | Commands::Status { .. }
                | Commands::Rate { .. }
                | Commands::Season { .. }
                | Commands::Delete { .. }
                | Commands::Import { .. }
        )
    }
}

/// Everything a command needs to run
pub struct App {
    pub config: Config,
    pub library: LibraryService,
    pub books: OpenLibraryProvider,
}

impl App {
    pub fn new(config: Config, library: LibraryService, books: OpenLibraryProvider) -> Self {
        Self {
            config,
            library,
            books,
        }
    }
}

/// Runs one command, writing its output to `out`
pub async fn run(app: &App, command: Commands, out: &mut dyn Write) -> AppResult<()> {
    let config = &app.config;
    if command.requires_session() {
        Session::require(&config.session_file, config.access_token.as_deref())?;
    }

    match command {
        Commands::Search { kind, query, by } => search(app, kind, &query, by, out).await,
        Commands::Add {
            kind,
            title,
            status,
        } => {
            let item = app.library.add(kind, &title, status).await?;
            writeln!(out, "Added {}", format_item(&item, Utc::now()))?;
            if let Some(poster) = config.poster_url(item.poster_path.as_deref()) {
                writeln!(out, "Poster: {}", poster)?;
            }
            Ok(())
        }
        Commands::List {
            kind,
            status,
            search,
            min_rating,
            genre,
            page,
        } => {
            let filter = ItemFilter {
                search,
                status,
                min_rating,
                genre,
            };
            list(app, kind, &filter, page, out).await
        }
        Commands::Stats { kind } => {
            let stats = app.library.stats(kind).await?;
            write_stats(kind, &stats, out)
        }
        Commands::Status { kind, id, status } => {
            let item = app.library.set_status(kind, id, status).await?;
            writeln!(out, "Updated {}", format_item(&item, Utc::now()))?;
            Ok(())
        }
        Commands::Rate { kind, id, rating } => {
            let item = app.library.set_rating(kind, id, rating).await?;
            writeln!(out, "Rated '{}' {}", item.title, rating.label())?;
            Ok(())
        }
        Commands::Season { id, season } => {
            let item = app.library.set_current_season(id, season).await?;
            writeln!(out, "Updated {}", format_item(&item, Utc::now()))?;
            Ok(())
        }
        Commands::Delete { kind, id } => {
            app.library.delete(kind, id).await?;
            writeln!(out, "Deleted {} {}", kind, id)?;
            Ok(())
        }
        Commands::Import { kind, file } => {
            let text = std::fs::read_to_string(&file)?;
            let report = app.library.import_csv(kind, &text).await?;
            writeln!(
                out,
                "Imported {} {} ({} skipped, {} failed)",
                report.imported,
                kind.plural(),
                report.skipped,
                report.failed
            )?;
            Ok(())
        }
        Commands::Export { kind, format, out: path } => {
            export(app, kind, format, path, out).await
        }
        Commands::Login { token } => {
            Session::login(&config.session_file, &token, config.access_token.as_deref())?;
            writeln!(out, "Signed in")?;
            Ok(())
        }
        Commands::Logout => {
            Session::logout(&config.session_file)?;
            writeln!(out, "Signed out")?;
            Ok(())
        }
    }
}

async fn search(
    app: &App,
    kind: MediaKind,
    query: &str,
    by: SearchBy,
    out: &mut dyn Write,
) -> AppResult<()> {
    if kind != MediaKind::Book && by != SearchBy::Title {
        return Err(AppError::InvalidInput(format!(
            "{} can only be searched by title",
            kind.plural()
        )));
    }

    let entries = match by {
        SearchBy::Title if kind == MediaKind::Book => {
            app.books.search_by_title(query, DEFAULT_SEARCH_LIMIT).await?
        }
        SearchBy::Title => app.library.catalog().search(kind, query).await?,
        SearchBy::Author => app.books.search_by_author(query, DEFAULT_SEARCH_LIMIT).await?,
        SearchBy::Isbn => vec![app.books.search_by_isbn(query).await?],
    };

    if entries.is_empty() {
        writeln!(out, "No results for '{}'", query)?;
        return Ok(());
    }

    for entry in &entries {
        writeln!(out, "{}", format_entry(entry))?;
    }

    if by == SearchBy::Title {
        if let Some((best, score)) = matching::find_best_match_scored(query, &entries) {
            writeln!(out, "\nBest match: {} (score {:.2})", best.title, score)?;
        }
    }

    Ok(())
}

async fn list(
    app: &App,
    kind: MediaKind,
    filter: &ItemFilter,
    page: usize,
    out: &mut dyn Write,
) -> AppResult<()> {
    if page == 0 {
        return Err(AppError::InvalidInput("Pages start at 1".to_string()));
    }

    let page = if filter.is_status_only() {
        app.library
            .page(kind, filter.status, page - 1, app.config.page_size)
            .await?
    } else {
        let items = app.library.items(kind, filter.status).await?;
        let filtered: Vec<LibraryItem> = filter.apply(&items).into_iter().cloned().collect();
        paginate(&filtered, page - 1, app.config.page_size)
    };

    let now = Utc::now();
    if page.items.is_empty() {
        writeln!(out, "No {} found", kind.plural())?;
    }
    for item in &page.items {
        writeln!(out, "{}", format_item(item, now))?;
    }
    writeln!(
        out,
        "\nPage {} of {} ({} {})",
        page.page + 1,
        page.display_pages(),
        page.total_items,
        kind.plural()
    )?;

    Ok(())
}

async fn export(
    app: &App,
    kind: MediaKind,
    format: ExportFormat,
    path: Option<PathBuf>,
    out: &mut dyn Write,
) -> AppResult<()> {
    let items = app.library.items(kind, None).await?;
    let now = Utc::now();
    let rendered = format.render(&items, now)?;

    if rendered.is_empty() {
        writeln!(out, "No data to export")?;
        return Ok(());
    }

    let path = path.unwrap_or_else(|| PathBuf::from(format.file_name(now.date_naive())));
    std::fs::write(&path, rendered)?;
    tracing::info!(path = %path.display(), items = items.len(), "Export written");
    writeln!(out, "Exported {} {} to {}", items.len(), kind.plural(), path.display())?;

    Ok(())
}

fn write_stats(kind: MediaKind, stats: &LibraryStats, out: &mut dyn Write) -> AppResult<()> {
    writeln!(out, "{} {}", stats.total, kind.plural())?;
    for (status, count) in &stats.by_status {
        writeln!(out, "  {:<10} {}", status.description(), count)?;
    }
    if stats.unknown_status > 0 {
        writeln!(out, "  {:<10} {}", "Unknown", stats.unknown_status)?;
    }
    match stats.average_rating {
        Some(average) => writeln!(out, "Average rating {:.1} ({} rated)", average, stats.rated)?,
        None => writeln!(out, "No ratings yet")?,
    }
    Ok(())
}

/// One-line summary of a library item
pub fn format_item(item: &LibraryItem, now: DateTime<Utc>) -> String {
    let mut line = format!("#{} {}", item.id, item.title);
    if let Some(year) = item.year {
        line.push_str(&format!(" ({})", year));
    }
    line.push_str(&format!(" [{}]", Status::describe_id(item.status_id)));
    if let Some(rating) = item.rating() {
        line.push_str(&format!(" {}", rating.stars()));
    }
    if let (Some(total), Some(progress)) = (item.total_seasons, item.season_progress()) {
        line.push_str(&format!(
            " S{}/{} ({:.0}%)",
            item.current_season.unwrap_or(1),
            total,
            progress
        ));
    }
    if let Some(director) = &item.director {
        line.push_str(&format!(" dir. {}", director));
    }
    if let Some(author) = &item.author {
        line.push_str(&format!(" by {}", author));
    }
    if item.created_at.is_some() {
        line.push_str(&format!(", added {}", relative_time(item.created_at, now)));
    }
    line
}

/// One-line summary of a catalog search result
pub fn format_entry(entry: &CatalogEntry) -> String {
    let mut line = format!("[{}] {}", entry.id, entry.title);
    if let Some(year) = entry.year {
        line.push_str(&format!(" ({})", year));
    }
    if let Some(original) = entry
        .original_title
        .as_deref()
        .filter(|original| *original != entry.title)
    {
        line.push_str(&format!(" / {}", original));
    }
    if let Some(author) = &entry.author {
        line.push_str(&format!(" by {}", author));
    }
    line
}

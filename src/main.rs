use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use watchlog::{
    auth::Session,
    cli::{self, App, Cli},
    config::Config,
    db::{create_redis_client, Cache, SupabaseStore},
    services::{
        providers::{CatalogProvider, OpenLibraryProvider, TmdbProvider},
        CatalogService, LibraryService,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("watchlog=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;

    // Catalog lookups are cached when Redis is configured
    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url).context("Invalid REDIS_URL")?;
            Cache::new(client).await
        }
        None => Cache::disabled(),
    };
    tracing::debug!(enabled = cache.is_enabled(), "Catalog cache ready");

    let session = Session::load(&config.session_file).context("Failed to read session file")?;
    let store = SupabaseStore::new(config.supabase_url.clone(), config.supabase_anon_key.clone())
        .with_access_token(session.map(|s| s.token));

    let tmdb = TmdbProvider::new(
        cache.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_language.clone(),
    );
    let books = OpenLibraryProvider::new(
        cache,
        config.openlibrary_url.clone(),
        config.openlibrary_covers_url.clone(),
    );

    let providers: Vec<Arc<dyn CatalogProvider>> = vec![Arc::new(tmdb), Arc::new(books.clone())];
    let library = LibraryService::new(Arc::new(store), CatalogService::new(providers));
    let app = App::new(config, library, books);

    let result = cli::run(&app, cli.command, &mut std::io::stdout()).await;
    cache_handle.shutdown().await;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {}", e);
            Ok(ExitCode::from(e.exit_code() as u8))
        }
    }
}

//! # folio-agent
//!
//! Terminal assistant that edits a project portfolio through a language
//! model. Wires settings, logging, the SQLite store, the chat model and a
//! chat session together, then runs the interactive loop.

#![deny(unsafe_code)]

mod provider_factory;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use folio_engine::{ChatSession, InMemoryStore, SessionConfig};
use folio_settings::FolioSettings;
use folio_store::SqlitePersistence;

/// Portfolio assistant.
#[derive(Parser, Debug)]
#[command(name = "folio-agent", about = "Chat with an assistant that updates your projects")]
struct Cli {
    /// Settings file (default: `~/.folio/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log level filter, e.g. `debug` or `folio_engine=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Insert demo projects when the database is empty.
    #[arg(long)]
    seed_demo: bool,
}

impl Cli {
    /// Fold command-line overrides into loaded settings.
    fn apply(&self, settings: &mut FolioSettings) {
        if let Some(path) = &self.db_path {
            settings.store.db_path = path.to_string_lossy().into_owned();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.seed_demo {
            settings.store.seed_demo = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(folio_settings::settings_path);
    let mut settings = folio_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    if settings.logging.json {
        folio_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        folio_core::logging::init_subscriber(&settings.logging.level);
    }

    let pool = folio_store::open(&settings.store)
        .with_context(|| format!("failed to open database at {}", settings.store.db_path))?;
    if settings.store.seed_demo {
        let _ = folio_store::seed_if_empty(&pool).context("failed to seed demo projects")?;
    }
    let persistence = SqlitePersistence::new(pool);
    let portfolio = persistence
        .load_portfolio()
        .context("failed to load portfolio")?;
    info!(projects = portfolio.len(), "portfolio loaded");

    let model = provider_factory::build_model(&settings.llm, |name| std::env::var(name).ok())?;
    let mut session = ChatSession::new(
        model,
        Arc::new(InMemoryStore::new(portfolio)),
        Arc::new(persistence),
        SessionConfig::from_settings(&settings.engine, &settings.llm),
    );

    repl::run(&mut session).await
}

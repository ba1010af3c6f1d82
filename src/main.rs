mod app;
mod app_state;
mod commands;
mod config;
mod event_handlers;
mod explorer;
mod filter_state;
mod logging;
mod query_runner;
mod rendering;
mod tree;

use app::App;
use clap::Parser;
use config::{Args, Config};
use miq_auth::{Keyring, MemoryStore, SecretStore};
use miq_db::{ConnectionRegistry, MySql};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let _guard = logging::init(&logging::log_directory())?;
    tracing::info!(?config, "starting");

    let secrets: Box<dyn SecretStore> = if args.no_keyring {
        Box::new(MemoryStore::new())
    } else {
        Box::new(Keyring::new())
    };
    let registry = ConnectionRegistry::open(&miq_db::get_db_path()?, secrets)?;

    let terminal = ratatui::init();
    let result = App::new(config, registry, Box::new(MySql::new()))
        .run(terminal)
        .await;
    ratatui::restore();
    result
}

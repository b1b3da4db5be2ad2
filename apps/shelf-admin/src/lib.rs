use std::sync::Arc;

use clap::{Parser, Subcommand};

use shelf_cli::ConfigArgs;
use shelf_config::Config;
use shelf_service::{QdrantIndex, ShelfService};
use shelf_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = shelf_cli::VERSION,
	rename_all = "kebab",
	styles = shelf_cli::styles(),
)]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Creates the database schema and the vector collection when they are missing.
	Init(ConfigArgs),
	/// Re-embeds every item and rewrites its vector index entry.
	RebuildIndex(ConfigArgs),
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	match args.command {
		Command::Init(config) => init(&load(&config)?).await,
		Command::RebuildIndex(config) => rebuild_index(load(&config)?).await,
	}
}

fn load(args: &ConfigArgs) -> color_eyre::Result<Config> {
	let cfg = shelf_config::load(&args.config)?;

	shelf_cli::init_tracing(&cfg.service.log_level);

	Ok(cfg)
}

async fn init(cfg: &Config) -> color_eyre::Result<()> {
	let db = Db::connect(&cfg.storage.postgres).await?;

	db.ensure_schema().await?;

	let store = QdrantStore::new(&cfg.storage.qdrant)?;
	let created = store.ensure_collection().await?;

	tracing::info!(collection = %store.collection, created, "Storage initialised.");

	Ok(())
}

async fn rebuild_index(cfg: Config) -> color_eyre::Result<()> {
	let db = Db::connect(&cfg.storage.postgres).await?;
	let store = QdrantStore::new(&cfg.storage.qdrant)?;

	store.ensure_collection().await?;

	let service = ShelfService::new(cfg, db, Arc::new(QdrantIndex::new(store)));
	let report = service.rebuild_index().await?;
	let json = serde_json::to_string_pretty(&report)?;

	println!("{json}");

	if report.error_count > 0 {
		tracing::warn!(
			error_count = report.error_count,
			"Some items remain unindexed. Rerun rebuild-index once the cause is fixed."
		);
	}

	Ok(())
}

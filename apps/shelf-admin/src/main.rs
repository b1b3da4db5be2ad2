// crates.io
use clap::Parser;
// self
use shelf_admin::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	shelf_admin::run(Args::parse()).await
}

use clap::Parser;

use hyrank_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	hyrank_eval::run(args).await
}

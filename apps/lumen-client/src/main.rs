use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lumen_client::Args::parse();

	lumen_client::run(args).await
}

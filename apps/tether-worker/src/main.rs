use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tether_worker::Args::parse();

	tether_worker::run(args).await
}

use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tabrank::Args::parse();

	tabrank::run(args).await
}

use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = docex_api::Args::parse();

	docex_api::run(args).await
}

use clap::Parser;
use st_core::ContentSource;
use tracing::info;

mod cli;
mod logging;

use cli::{handle_command, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = cli.cms_config();
    let site = cli.site_config();

    let source = st_cms::create_source(&config).await?;
    info!("🛰️ Content source ready (using {})", source.name());

    handle_command(cli.command, source, config, site).await
}

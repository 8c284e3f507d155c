//! `scisum`: command-line front end for SciSummarize.

mod cli;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    cli::run(cli).await
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "scisummarize=debug,scisum=debug"
    } else {
        "scisummarize=info,scisum=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

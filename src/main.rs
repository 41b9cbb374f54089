use clap::Parser;
use pmp_request_auth::cli::{self, Cli, Command};
use pmp_request_auth::infrastructure::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging(&cli.logging())?;

    match cli.command {
        Command::Sign(args) => cli::sign::run(args),
        Command::Nonce(args) => cli::nonce::run(args),
        Command::Config => cli::show_config::run(),
        Command::Demo(args) => cli::demo::run(args).await,
    }
}

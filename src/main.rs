mod cli;
mod runtime;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Worker => runtime::run_worker(cli.config).await?,
        Commands::Enqueue(args) => {
            runtime::enqueue_mail(cli.config, args.to, args.subject, args.body, args.html).await?
        }
    }

    Ok(())
}

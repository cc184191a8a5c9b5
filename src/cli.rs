use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskbox")]
#[command(about = "TaskBox CLI", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (default: config/taskbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the background worker (one consumer loop per registered handler)
    Worker,
    /// Queue an outbound email (producer-side utility)
    Enqueue(EnqueueArgs),
}

#[derive(clap::Args, Debug)]
pub struct EnqueueArgs {
    /// Recipient address; repeat for multiple recipients
    #[arg(long, required = true)]
    pub to: Vec<String>,

    #[arg(long)]
    pub subject: String,

    #[arg(long)]
    pub body: String,

    /// Send the body as HTML instead of plain text
    #[arg(long)]
    pub html: bool,
}

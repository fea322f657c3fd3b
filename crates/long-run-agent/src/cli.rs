use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " ", env!("LRA_GIT_DESCRIBE"));

#[derive(Parser)]
#[command(name = "lra")]
#[command(version = VERSION)]
#[command(about = "Long-Run Agent: autonomous coding harness with rate-limit recovery")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the user and project config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run initializer and coding sessions until done, waiting out rate limits
    Run(RunArgs),

    /// List app spec files available in the prompts directory
    ListSpecs,

    /// Serve the browser visual-testing tool over stdio (JSON-RPC)
    BrowserServer,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory the agent builds the project in
    #[arg(long, default_value = "./generations/app")]
    pub project_dir: PathBuf,

    /// Stop after this many successful sessions (default: unlimited)
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Model for every session (ignored with --hybrid)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Use the planning model for the initializer session and the coding model afterwards
    #[arg(long)]
    pub hybrid: bool,

    /// Spec file from the prompts directory to copy into the project
    #[arg(long)]
    pub spec_file: Option<String>,
}

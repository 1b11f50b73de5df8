use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::AppError;
use crate::server;
use crate::split;

#[derive(Parser, Debug)]
#[command(
    name = "hireflow",
    about = "Run the candidate roster import and workflow progression service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Split a bookmarked PDF bundle into per-candidate files
    Split(SplitArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct SplitArgs {
    /// Bundle PDF to split along its top-level bookmarks
    #[arg(long)]
    pub(crate) bundle: PathBuf,
    /// Directory receiving one PDF per bookmark (defaults to the bundle's directory)
    #[arg(long)]
    pub(crate) out_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Split(args) => split::run(args),
    }
}

use crate::demo::{run_diagnose, run_questions, DiagnoseArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use grant_insight::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Grant Insight Diagnosis",
    about = "Run the Grant Insight diagnosis service or try the matching engine from the command line",
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
    /// Print the diagnosis question catalog
    Questions,
    /// Run a single diagnosis against a grant catalog and print the results
    Diagnose(DiagnoseArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Grant catalog CSV to serve instead of APP_GRANTS_CSV or the bundled sample
    #[arg(long)]
    pub(crate) grants_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Questions => run_questions(),
        Command::Diagnose(args) => run_diagnose(args).await,
    }
}

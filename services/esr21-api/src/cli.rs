use crate::server;
use crate::simulate::{run_simulation, SimulateArgs};
use clap::{Args, Parser, Subcommand};
use esr21_enrollment::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "ESR21 Enrollment Service",
    about = "Run the ESR21 consent and illness scheduling service from the command line",
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
    /// Replay a batch of synthetic consents and illness reports against an in-memory store
    Simulate(SimulateArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Simulate(args) => run_simulation(args),
    }
}

use crate::commands::{run_audit, run_evaluate, AuditArgs, EvaluateArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use medfee::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "medfee",
    about = "Select payment rules and compute professional fees for medical billing events",
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
    /// Evaluate one billing context against a JSON rule file
    Evaluate(EvaluateArgs),
    /// Report ambiguous rule pairs in a JSON rule file
    Audit(AuditArgs),
    /// Walk through a built-in rule set and a handful of sample events
    Demo(DemoArgs),
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
        Command::Evaluate(args) => run_evaluate(args),
        Command::Audit(args) => run_audit(args),
        Command::Demo(args) => run_demo(args),
    }
}

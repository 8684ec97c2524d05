use crate::invoke::{run_invoke, InvokeArgs};
use crate::server;
use crate::submit::{run_submit, SubmitArgs};
use clap::{Args, Parser, Subcommand};
use registration_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Registration Intake",
    about = "Receive registration forms and forward them by email",
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
    /// Run one serverless gateway event through the handler and print the response
    Invoke(InvokeArgs),
    /// Fill in the registration form and post it to a running service
    Submit(SubmitArgs),
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
        Command::Invoke(args) => run_invoke(args).await,
        Command::Submit(args) => run_submit(args).await,
    }
}

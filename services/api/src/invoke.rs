use crate::infra::submission_handler;
use clap::Args;
use registration_intake::config::AppConfig;
use registration_intake::error::AppError;
use registration_intake::intake::{invoke, FunctionEvent};
use registration_intake::telemetry;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

#[derive(Args, Debug)]
pub(crate) struct InvokeArgs {
    /// Path to a JSON gateway event, or `-` to read it from stdin
    #[arg(long)]
    pub(crate) event: PathBuf,
}

pub(crate) async fn run_invoke(args: InvokeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let raw = if args.event.as_os_str() == "-" {
        let mut buffer = Vec::new();
        tokio::io::stdin().read_to_end(&mut buffer).await?;
        buffer
    } else {
        tokio::fs::read(&args.event).await?
    };
    let event: FunctionEvent = serde_json::from_slice(&raw)?;

    let handler = submission_handler(&config)?;
    let response = invoke(&*handler, event).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

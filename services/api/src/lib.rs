mod cli;
mod infra;
mod invoke;
mod routes;
mod server;
mod submit;

use registration_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

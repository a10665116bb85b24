mod cli;
mod infra;
mod routes;
mod server;
mod simulate;

use esr21_enrollment::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

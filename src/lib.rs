//! Candidate roster import, matching, and workflow progression for a
//! recruitment pipeline, served over HTTP with an asynchronous import worker.

mod cli;
mod server;
mod split;

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

use error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

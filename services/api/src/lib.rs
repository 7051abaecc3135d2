mod cli;
mod infra;
mod routes;
mod server;

use kyc_dossier::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

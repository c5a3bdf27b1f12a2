#[tokio::main]
async fn main() -> Result<(), confdesk::error::AppError> {
    confdesk::telemetry::init();
    confdesk::cli::run().await
}

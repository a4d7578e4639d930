use anyhow::{Context, Result};
use perms_server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let config = ServerConfig::load().context("Failed to load configuration")?;

    perms_server::run(config).await.context("Server error")?;

    Ok(())
}

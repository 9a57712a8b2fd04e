/*
 * Responsibility
 * - Start the tokio runtime
 * - Call app::run() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    oauth_identity::app::run().await
}

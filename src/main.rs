use anyhow::Result;
use tracing::info;

use payflow::app::App;
use payflow::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present (no-op in prod/systemd envs)
    let _ = dotenvy::dotenv();

    payflow::telemetry::init_tracing();

    let cfg = Config::from_env()?;
    info!(?cfg, "boot");

    App::from_config(&cfg).run().await
}

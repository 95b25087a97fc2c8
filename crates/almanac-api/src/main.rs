//! Binary entrypoint for the almanac API server.
use almanac_api::{run, AppConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "almanac_api=info,almanac_core=info,almanac_stages=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::parse();
    run(config).await
}

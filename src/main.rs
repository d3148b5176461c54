use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use brewhub::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let config = ServerConfig::from_env().with_args(&args);

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "brewhub",
        "brewhub starting: RUST_LOG='{}', http_port={}, denied_redirect='{}', seed_file={:?}",
        rust_log, config.http_port, config.auth.denied_redirect, config.seed_file
    );

    brewhub::server::run(config).await
}

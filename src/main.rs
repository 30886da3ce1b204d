use std::process::ExitCode;

use mapbridge::config::BridgeConfig;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Stdout carries frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    tracing::info!(view_id = config.view_id, platform = %config.platform_version, "mapbridge serving on stdio");
    match mapbridge::host::serve(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "host i/o failed");
            ExitCode::FAILURE
        }
    }
}

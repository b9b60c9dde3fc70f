//! Delta Anomaly - Main Entry Point
//!
//! Serves the isolation forest endpoint, or scores a batch from the command line.

use clap::Parser;
use delta_anomaly::cli::{cmd_score, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delta_anomaly=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, host }) => {
            cmd_serve(host, port).await?;
        }
        Some(Commands::Score { values, json }) => {
            cmd_score(&values, json)?;
        }
        None => {
            cmd_serve(None, None).await?;
        }
    }

    Ok(())
}

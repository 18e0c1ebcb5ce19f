use clap::Parser;
use gcs_transfer::cli::{exit_status, run, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status for configuration and setup errors (clap uses the same for usage errors).
const CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => {
            let code = ExitCode::from(exit_status(&report));
            if report.has_failures() {
                tracing::error!(
                    failed = report.failed().count(),
                    "CLI completed with failed buckets"
                );
            } else {
                tracing::info!("CLI completed successfully");
            }
            code
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("Error: {e:#}");
            ExitCode::from(CONFIG_ERROR)
        }
    }
}

use clap::Parser;
use std::process::ExitCode;
use tawatch::cli::Args;
use tawatch::config::Config;
use tawatch::logging::setup_logging;
use tawatch::watcher::Watcher;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config before anything else so logging setup can see LOG_LEVEL.
    let config = {
        use figment::providers::Env;
        match figment::Figment::new().merge(Env::raw()).extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                return ExitCode::FAILURE;
            }
        }
    };
    setup_logging(&config, args.tracing);

    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting tawatch"
    );

    let watcher = match Watcher::new(config).await {
        Ok(watcher) => watcher,
        Err(e) => {
            error!(error = ?e, "failed to initialize watcher");
            return ExitCode::FAILURE;
        }
    };

    if args.once {
        return match watcher.run_once().await {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { watcher.run(cancel).await }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = ?e, "failed to listen for shutdown signal"),
    }
    cancel.cancel();
    let _ = loop_handle.await;

    ExitCode::SUCCESS
}

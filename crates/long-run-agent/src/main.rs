use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

mod browser_cmd;
mod cli;
mod logging;
mod orchestrator;
mod report;
mod run_cmd;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Only `run` writes a per-run log file; the guard flushes it on exit.
    let mut _log_guard = None;
    let file_writer = match &cli.command {
        Commands::Run(args) => {
            let log_dir = lra_config::paths::project_logs_dir(&args.project_dir);
            match logging::create_run_log_writer(&log_dir) {
                Ok((writer, guard)) => {
                    _log_guard = Some(guard);
                    Some(writer)
                }
                Err(e) => {
                    eprintln!("WARNING: could not create run log in {}: {e:#}", log_dir.display());
                    None
                }
            }
        }
        _ => None,
    };
    logging::init_tracing(file_writer);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Run(args) => {
            let exit_code = run_cmd::handle_run(args, config_path, cancel).await?;
            drop(_log_guard);
            std::process::exit(exit_code);
        }
        Commands::ListSpecs => run_cmd::handle_list_specs(config_path)?,
        Commands::BrowserServer => {
            browser_cmd::handle_browser_server(config_path, cancel).await?;
            // A pending blocking stdin read would otherwise hold runtime shutdown.
            std::process::exit(0);
        }
    }

    Ok(())
}

use anyhow::Result;
use lra_config::HarnessConfig;
use lra_mcp::{DriverAutomation, DriverCommand, McpServer};
use std::path::Path;
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serve the browser tool on stdin/stdout until EOF or cancellation.
pub(crate) async fn handle_browser_server(
    config_path: Option<&Path>,
    cancel: CancellationToken,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = HarnessConfig::load(&cwd, config_path)?;
    let browser = &config.browser;

    let automation = DriverAutomation::new(
        DriverCommand {
            program: browser.driver_command.clone(),
            args: browser.driver_args.clone(),
        },
        browser.default_viewport,
    )
    .with_reply_timeout(Duration::from_secs(browser.reply_timeout_secs));
    let server = McpServer::new(automation, browser.default_viewport);
    info!(driver = %browser.driver_command, "Browser tool server listening on stdio");

    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), &cancel)
        .await
}

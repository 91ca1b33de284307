mod bootstrap_helpers;
mod cli_args;
mod credential_map;
mod runtime_cli_validation;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use relay_github::GithubApiClient;
use relay_slack_runtime::{run_slack_bridge, SlackBridgeRuntimeConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::credential_map::StaticCredentialMap;
use crate::runtime_cli_validation::{resolve_non_empty_cli_value, validate_bridge_cli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}

async fn run_cli(cli: Cli) -> Result<()> {
    validate_bridge_cli(&cli)?;
    let config = build_runtime_config(&cli)?;
    tracing::info!(
        github_web_host = %config.github_web_host,
        require_write_access = config.require_write_access,
        "starting pull request card bridge"
    );
    run_slack_bridge(config).await
}

fn build_runtime_config(cli: &Cli) -> Result<SlackBridgeRuntimeConfig> {
    let github_token = resolve_non_empty_cli_value(cli.github_token.as_deref())
        .context("--github-token is required")?;
    let platform = GithubApiClient::new(
        cli.github_api_base.trim().to_string(),
        github_token,
        cli.request_timeout_ms,
    )?;

    let credentials_path = cli
        .credentials_file
        .as_deref()
        .context("--credentials-file is required")?;
    let credentials = StaticCredentialMap::load(credentials_path)?;
    if credentials.is_empty() {
        tracing::warn!(
            path = %credentials_path.display(),
            "credentials file maps no slack users; every review action will be refused"
        );
    }

    Ok(SlackBridgeRuntimeConfig {
        platform: Arc::new(platform),
        credentials: Arc::new(credentials),
        api_base: cli.slack_api_base.trim().to_string(),
        app_token: resolve_non_empty_cli_value(cli.slack_app_token.as_deref())
            .context("--slack-app-token is required")?,
        bot_token: resolve_non_empty_cli_value(cli.slack_bot_token.as_deref())
            .context("--slack-bot-token is required")?,
        bot_user_id: resolve_non_empty_cli_value(cli.slack_bot_user_id.as_deref()),
        github_web_host: cli.github_web_host.trim().to_string(),
        require_write_access: cli.require_write_access,
        request_timeout_ms: cli.request_timeout_ms,
        processed_event_cap: cli.processed_event_cap,
        max_event_age_seconds: cli.max_event_age_seconds,
        reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
    })
}

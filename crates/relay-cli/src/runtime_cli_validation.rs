use anyhow::{bail, Result};

use crate::cli_args::Cli;

pub(crate) fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub(crate) fn validate_bridge_cli(cli: &Cli) -> Result<()> {
    if resolve_non_empty_cli_value(cli.slack_app_token.as_deref()).is_none() {
        bail!("--slack-app-token is required");
    }
    if resolve_non_empty_cli_value(cli.slack_bot_token.as_deref()).is_none() {
        bail!("--slack-bot-token is required");
    }
    if resolve_non_empty_cli_value(cli.github_token.as_deref()).is_none() {
        bail!("--github-token is required");
    }
    if cli.credentials_file.is_none() {
        bail!("--credentials-file is required");
    }
    if cli.github_web_host.trim().is_empty() || cli.github_web_host.contains("://") {
        bail!("--github-web-host must be a bare host name such as github.com");
    }
    for (flag, base) in [
        ("--slack-api-base", cli.slack_api_base.as_str()),
        ("--github-api-base", cli.github_api_base.as_str()),
    ] {
        let base = base.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            bail!("{flag} must be an http(s) URL");
        }
    }
    if cli.request_timeout_ms == 0 {
        bail!("--request-timeout-ms must be greater than 0");
    }
    if cli.processed_event_cap == 0 {
        bail!("--processed-event-cap must be greater than 0");
    }
    if cli.reconnect_delay_ms == 0 {
        bail!("--reconnect-delay-ms must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{resolve_non_empty_cli_value, validate_bridge_cli};
    use crate::cli_args::Cli;
    use clap::Parser;

    fn valid_args() -> Vec<&'static str> {
        vec![
            "pr-relay",
            "--slack-app-token",
            "xapp-1",
            "--slack-bot-token",
            "xoxb-1",
            "--github-token",
            "ghp-service",
            "--credentials-file",
            "reviewers.toml",
        ]
    }

    #[test]
    fn unit_resolve_non_empty_cli_value_trims_blank_values() {
        assert_eq!(resolve_non_empty_cli_value(Some("  ")), None);
        assert_eq!(
            resolve_non_empty_cli_value(Some(" xoxb ")).as_deref(),
            Some("xoxb")
        );
        assert_eq!(resolve_non_empty_cli_value(None), None);
    }

    #[test]
    fn functional_validate_bridge_cli_accepts_complete_configuration() {
        let cli = Cli::parse_from(valid_args());
        validate_bridge_cli(&cli).expect("valid configuration");
    }

    #[test]
    fn regression_validate_bridge_cli_rejects_missing_tokens() {
        let cli = Cli::parse_from(["pr-relay", "--slack-bot-token", "xoxb-1"]);
        let error = validate_bridge_cli(&cli).expect_err("missing app token");
        assert!(error.to_string().contains("--slack-app-token"));

        let cli = Cli::parse_from([
            "pr-relay",
            "--slack-app-token",
            "xapp-1",
            "--slack-bot-token",
            "xoxb-1",
            "--github-token",
            "   ",
            "--credentials-file",
            "reviewers.toml",
        ]);
        let error = validate_bridge_cli(&cli).expect_err("blank github token");
        assert!(error.to_string().contains("--github-token"));
    }

    #[test]
    fn regression_validate_bridge_cli_rejects_zero_limits_and_bad_hosts() {
        let mut args = valid_args();
        args.extend(["--processed-event-cap", "0"]);
        let error = validate_bridge_cli(&Cli::parse_from(args)).expect_err("zero cap");
        assert!(error.to_string().contains("--processed-event-cap"));

        let mut args = valid_args();
        args.extend(["--github-web-host", "https://github.com"]);
        let error = validate_bridge_cli(&Cli::parse_from(args)).expect_err("url host");
        assert!(error.to_string().contains("--github-web-host"));

        let mut args = valid_args();
        args.extend(["--slack-api-base", "slack.com/api"]);
        let error = validate_bridge_cli(&Cli::parse_from(args)).expect_err("bad base");
        assert!(error.to_string().contains("--slack-api-base"));
    }
}

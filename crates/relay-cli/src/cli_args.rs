use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "pr-relay",
    about = "Posts GitHub pull request cards in Slack and turns button clicks into reviews",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "slack-app-token",
        env = "RELAY_SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack Socket Mode app token (xapp-...)"
    )]
    pub slack_app_token: Option<String>,

    #[arg(
        long = "slack-bot-token",
        env = "RELAY_SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "RELAY_SLACK_BOT_USER_ID",
        help = "Optional bot user id used to ignore self-authored messages (resolved via auth.test when unset)"
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "RELAY_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "github-token",
        env = "RELAY_GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token used to read pull requests and collaborator permissions"
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "RELAY_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "GitHub REST API base URL"
    )]
    pub github_api_base: String,

    #[arg(
        long = "github-web-host",
        env = "RELAY_GITHUB_WEB_HOST",
        default_value = "github.com",
        help = "Host name of pull request links to detect in Slack messages"
    )]
    pub github_web_host: String,

    #[arg(
        long = "credentials-file",
        env = "RELAY_CREDENTIALS_FILE",
        help = "TOML file mapping Slack user ids to the GitHub login and token used for their reviews"
    )]
    pub credentials_file: Option<PathBuf>,

    #[arg(
        long = "require-write-access",
        env = "RELAY_REQUIRE_WRITE_ACCESS",
        default_value_t = false,
        help = "Refuse reviews from GitHub users without write or admin permission on the repository"
    )]
    pub require_write_access: bool,

    #[arg(
        long = "request-timeout-ms",
        env = "RELAY_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        help = "Timeout for Slack and GitHub HTTP requests in milliseconds"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "processed-event-cap",
        env = "RELAY_PROCESSED_EVENT_CAP",
        default_value_t = 10_000,
        help = "Maximum processed-event keys to retain for duplicate delivery protection"
    )]
    pub processed_event_cap: usize,

    #[arg(
        long = "max-event-age-seconds",
        env = "RELAY_MAX_EVENT_AGE_SECONDS",
        default_value_t = 7_200,
        help = "Ignore inbound Slack events older than this many seconds (0 disables age checks)"
    )]
    pub max_event_age_seconds: u64,

    #[arg(
        long = "reconnect-delay-ms",
        env = "RELAY_RECONNECT_DELAY_MS",
        default_value_t = 1_000,
        help = "Delay before reconnecting after socket/session errors"
    )]
    pub reconnect_delay_ms: u64,
}

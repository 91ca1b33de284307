//! Slack Socket Mode runtime for the pull-request card bridge.
//!
//! Detects pull-request links in channel messages, posts review cards, and
//! turns button clicks and modal submissions into GitHub reviews followed by
//! an in-place card update.

mod slack_helpers;
pub mod slack_runtime;

pub use slack_runtime::{run_slack_bridge, SlackBridgeRuntimeConfig};

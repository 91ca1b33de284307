use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn current_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Parses a Slack message timestamp (`"1700000000.000100"`) into unix milliseconds.
pub(crate) fn slack_ts_to_unix_ms(ts: &str) -> Option<u64> {
    let (seconds, fraction) = ts.trim().split_once('.').unwrap_or((ts.trim(), ""));
    let seconds = seconds.parse::<u64>().ok()?;
    let millis = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(3)
        .collect::<String>()
        .parse::<u64>()
        .ok()?;
    Some(seconds.saturating_mul(1000).saturating_add(millis))
}

#[cfg(test)]
mod tests {
    use super::slack_ts_to_unix_ms;

    #[test]
    fn unit_slack_ts_to_unix_ms_parses_fractional_seconds() {
        assert_eq!(slack_ts_to_unix_ms("1700000000.123456"), Some(1_700_000_000_123));
        assert_eq!(slack_ts_to_unix_ms("1700000000"), Some(1_700_000_000_000));
        assert_eq!(slack_ts_to_unix_ms("1700000000.5"), Some(1_700_000_000_500));
        assert_eq!(slack_ts_to_unix_ms("not-a-ts"), None);
    }
}

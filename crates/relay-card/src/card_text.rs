//! Text formatting shared by the card renderer and the Block Kit codec.

use crate::{MergeabilityState, ReviewState};

pub const DESCRIPTION_MAX_CHARS: usize = 300;
pub const ELLIPSIS: &str = "...";

/// Cuts `value` to exactly `max_chars` characters and appends [`ELLIPSIS`]
/// when it is longer. No word-boundary handling.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str(ELLIPSIS);
    truncated
}

pub fn status_glyph(state: &ReviewState, draft: bool) -> &'static str {
    if draft {
        return "🚧";
    }
    match state {
        ReviewState::Open => "🟢",
        ReviewState::Closed => "🔴",
        ReviewState::Merged => "🟣",
        ReviewState::Other(_) => "⚪",
    }
}

pub fn mergeability_glyph(state: &MergeabilityState) -> &'static str {
    match state {
        MergeabilityState::Clean => "✅",
        MergeabilityState::Dirty => "❌",
        MergeabilityState::Unstable => "⚠️",
        MergeabilityState::Blocked => "🚫",
        MergeabilityState::Unknown
        | MergeabilityState::NotYetComputed
        | MergeabilityState::Other(_) => "❓",
    }
}

pub fn mergeability_label(state: &MergeabilityState) -> &'static str {
    match state {
        MergeabilityState::Clean => "Ready to merge",
        MergeabilityState::Dirty => "Merge conflicts",
        MergeabilityState::Unstable => "Checks failing",
        MergeabilityState::Blocked => "Blocked",
        MergeabilityState::Unknown => "Checking...",
        MergeabilityState::NotYetComputed | MergeabilityState::Other(_) => "Unknown",
    }
}

/// Escapes the three control characters Slack mrkdwn reserves.
pub fn escape_mrkdwn(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{
        escape_mrkdwn, mergeability_glyph, mergeability_label, status_glyph, truncate_chars,
        DESCRIPTION_MAX_CHARS,
    };
    use crate::{MergeabilityState, ReviewState};

    #[test]
    fn unit_truncate_chars_cuts_exactly_at_limit() {
        let body = "a".repeat(DESCRIPTION_MAX_CHARS + 1);
        let truncated = truncate_chars(&body, DESCRIPTION_MAX_CHARS);
        assert_eq!(truncated, format!("{}...", "a".repeat(DESCRIPTION_MAX_CHARS)));

        let exact = "b".repeat(DESCRIPTION_MAX_CHARS);
        assert_eq!(truncate_chars(&exact, DESCRIPTION_MAX_CHARS), exact);
    }

    #[test]
    fn regression_truncate_chars_preserves_unicode_boundaries() {
        let value = "ré🌊view";
        assert_eq!(truncate_chars(value, 20), value);
        assert_eq!(truncate_chars(value, 3), "ré🌊...");
        assert_eq!(truncate_chars(value, 0), "...");
    }

    #[test]
    fn unit_status_glyph_prefers_draft_over_state() {
        assert_eq!(status_glyph(&ReviewState::Open, true), "🚧");
        assert_eq!(status_glyph(&ReviewState::Open, false), "🟢");
        assert_eq!(status_glyph(&ReviewState::Closed, false), "🔴");
        assert_eq!(status_glyph(&ReviewState::Merged, false), "🟣");
        assert_eq!(
            status_glyph(&ReviewState::Other("locked".to_string()), false),
            "⚪"
        );
    }

    #[test]
    fn unit_mergeability_enumerations_cover_every_state() {
        let cases = [
            (MergeabilityState::Clean, "✅", "Ready to merge"),
            (MergeabilityState::Dirty, "❌", "Merge conflicts"),
            (MergeabilityState::Unstable, "⚠️", "Checks failing"),
            (MergeabilityState::Blocked, "🚫", "Blocked"),
            (MergeabilityState::Unknown, "❓", "Checking..."),
            (MergeabilityState::NotYetComputed, "❓", "Unknown"),
            (MergeabilityState::Other("behind".to_string()), "❓", "Unknown"),
        ];
        for (state, glyph, label) in cases {
            assert_eq!(mergeability_glyph(&state), glyph);
            assert_eq!(mergeability_label(&state), label);
        }
    }

    #[test]
    fn unit_escape_mrkdwn_replaces_reserved_characters() {
        assert_eq!(
            escape_mrkdwn("Fix <script> & \"quotes\" > all"),
            "Fix &lt;script&gt; &amp; \"quotes\" &gt; all"
        );
    }
}

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::GithubApiError;

pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim() == "0")
        .unwrap_or(false)
}

pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Extracts the most specific message from a GitHub error body.
///
/// Validation failures put the useful text in `errors`, either as strings or
/// as objects with a `message` field.
pub fn github_error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return truncate_for_error(body.trim(), 300);
    };
    let details = parsed
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|error| {
                    error
                        .as_str()
                        .or_else(|| error.get("message").and_then(Value::as_str))
                })
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();
    if !details.is_empty() {
        return truncate_for_error(&details, 300);
    }
    parsed
        .get("message")
        .and_then(Value::as_str)
        .map(|message| truncate_for_error(message.trim(), 300))
        .unwrap_or_else(|| truncate_for_error(body.trim(), 300))
}

pub fn classify_github_failure(status: u16, headers: &HeaderMap, body: &str) -> GithubApiError {
    match status {
        404 => GithubApiError::NotFound,
        429 => GithubApiError::RateLimited {
            retry_after_seconds: parse_retry_after(headers),
        },
        403 if rate_limit_exhausted(headers) => GithubApiError::RateLimited {
            retry_after_seconds: parse_retry_after(headers),
        },
        401 | 403 => GithubApiError::AuthError { status },
        409 | 422 => GithubApiError::Conflict {
            message: github_error_message(body),
        },
        _ => GithubApiError::Status {
            status,
            body: truncate_for_error(body, 800),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_github_failure, github_error_message, parse_retry_after, truncate_for_error};
    use crate::GithubApiError;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn unit_parse_retry_after_parses_seconds_and_rejects_invalid_values() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("4"));
        assert_eq!(parse_retry_after(&headers), Some(4));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("bad-value"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn unit_classify_github_failure_maps_status_taxonomy() {
        let empty = HeaderMap::new();
        assert_eq!(
            classify_github_failure(404, &empty, "{}"),
            GithubApiError::NotFound
        );
        assert_eq!(
            classify_github_failure(401, &empty, "{}"),
            GithubApiError::AuthError { status: 401 }
        );
        assert_eq!(
            classify_github_failure(403, &empty, "{}"),
            GithubApiError::AuthError { status: 403 }
        );
        assert_eq!(
            classify_github_failure(409, &empty, r#"{"message":"Head moved"}"#),
            GithubApiError::Conflict {
                message: "Head moved".to_string()
            }
        );
        assert_eq!(
            classify_github_failure(502, &empty, "bad gateway"),
            GithubApiError::Status {
                status: 502,
                body: "bad gateway".to_string()
            }
        );
    }

    #[test]
    fn regression_classify_github_failure_detects_exhausted_rate_limit_on_403() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        assert_eq!(
            classify_github_failure(403, &headers, "{}"),
            GithubApiError::RateLimited {
                retry_after_seconds: Some(60)
            }
        );
        assert_eq!(
            classify_github_failure(429, &HeaderMap::new(), ""),
            GithubApiError::RateLimited {
                retry_after_seconds: None
            }
        );
    }

    #[test]
    fn unit_github_error_message_prefers_validation_details() {
        assert_eq!(
            github_error_message(
                r#"{"message":"Unprocessable Entity","errors":["Can not approve your own pull request"]}"#
            ),
            "Can not approve your own pull request"
        );
        assert_eq!(
            github_error_message(r#"{"message":"Validation Failed","errors":[{"message":"body is required"}]}"#),
            "body is required"
        );
        assert_eq!(github_error_message("plain failure"), "plain failure");
    }

    #[test]
    fn regression_truncate_for_error_appends_ellipsis() {
        assert_eq!(truncate_for_error("abcdef", 3), "abc...");
        assert_eq!(truncate_for_error("abc", 3), "abc");
    }
}

use std::time::Duration;

use reqwest::Client;

pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("creatorflow/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// Pulls the provider's own error message out of a failed response body when
/// it is JSON, and always returns a log-safe summary of the body.
pub fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_for_log("héllo", 10), "héllo");
        assert_eq!(truncate_for_log("héllo", 2), "hé... (truncated)");
    }

    #[test]
    fn prefers_nested_error_message() {
        let (message, summary) =
            summarize_error_body(r#"{"error":{"message":"quota exceeded","code":429}}"#);
        assert_eq!(message.as_deref(), Some("quota exceeded"));
        assert!(summary.contains("quota exceeded"));
    }

    #[test]
    fn handles_plain_text_and_empty_bodies() {
        assert_eq!(summarize_error_body("  ").1, "empty response body");
        let (message, summary) = summarize_error_body("Bad Gateway");
        assert!(message.is_none());
        assert_eq!(summary, "Bad Gateway");
    }
}

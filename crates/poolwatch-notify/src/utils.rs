//! Helpers shared by notification channels.

/// Maximum length of a response body kept in error messages.
pub const MAX_BODY_LENGTH: usize = 1000;

/// Truncates `s` to at most `max_len` bytes on a char boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

/// Slack-style message text: bold title, body, then `key: value` lines.
pub fn slack_text(alert: &poolwatch_common::types::AlertEvent) -> String {
    let mut text = format!("*{}*\n{}", alert.title, alert.body);
    for (key, value) in &alert.fields {
        text.push_str(&format!("\n{key}: {value}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 5), "hello... [truncated]");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        // '→' is three bytes; cutting at 2 must back off to 1.
        assert_eq!(truncate_string("a→b", 2), "a... [truncated]");
    }
}

//! Small helpers for query handling and display.

/// Maximum accepted query length, in characters, after sanitization.
const MAX_QUERY_CHARS: usize = 500;

/// Sanitize a research query: strip markup-significant characters, trim,
/// and cap the length.
pub fn sanitize_query(query: &str) -> String {
    let re = regex::Regex::new(r#"[<>"']"#).unwrap();
    let mut sanitized = re.replace_all(query.trim(), "").to_string();

    // Cap counts characters, not bytes.
    if let Some((end, _)) = sanitized.char_indices().nth(MAX_QUERY_CHARS) {
        sanitized.truncate(end);
    }

    sanitized
}

/// Basic shape check for an email address.
pub fn validate_email(email: &str) -> bool {
    let re = regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

/// Format a duration as a short human-readable string.
pub fn format_duration(duration: std::time::Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sanitize_query_strips_markup() {
        assert_eq!(
            sanitize_query("  what is <script>\"rust\"</script>?  "),
            "what is scriptrust/script?"
        );
    }

    #[test]
    fn test_sanitize_query_caps_length() {
        let long = "a".repeat(600);
        assert_eq!(sanitize_query(&long).len(), 500);
    }

    #[test]
    fn test_sanitize_query_caps_multibyte_in_chars() {
        let long = "é".repeat(600);
        assert_eq!(sanitize_query(&long).chars().count(), 500);

        let short = "é".repeat(400);
        assert_eq!(sanitize_query(&short).chars().count(), 400);
    }

    #[test]
    fn test_sanitize_query_empty() {
        assert_eq!(sanitize_query("   "), "");
        assert_eq!(sanitize_query("<>\"'"), "");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("reader@example.com"));
        assert!(validate_email("first.last+tag@sub.example.co"));
        assert!(!validate_email(""));
        assert!(!validate_email("no-at-sign"));
        assert!(!validate_email("missing@tld"));
        assert!(!validate_email("spaces in@example.com"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs_f64(12.34)), "12.3s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2.0h");
    }
}

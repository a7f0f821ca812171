// Keyword Classification
//
// Priority-ordered keyword rules that colorize XMRig output lines which
// carry no ANSI styling of their own. First matching rule wins.

use once_cell::sync::Lazy;
use regex::Regex;

pub const COLOR_SUCCESS: &str = "#44ff44";
pub const COLOR_INFO: &str = "#ff44ff";
pub const COLOR_ERROR: &str = "#ff4444";
pub const COLOR_WARNING: &str = "#ffff44";

static KEYWORD_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)\baccepted\b").unwrap(), COLOR_SUCCESS),
        (Regex::new(r"(?i)\bnew job\b").unwrap(), COLOR_INFO),
        (Regex::new(r"(?i)\brejected\b").unwrap(), COLOR_ERROR),
        (
            Regex::new(r"(?i)\berror\b|\bfailed\b|\bexception\b").unwrap(),
            COLOR_ERROR,
        ),
        (
            Regex::new(r"(?i)\bdifficulty\b|\bhashrate\b|\bshare\b").unwrap(),
            COLOR_WARNING,
        ),
    ]
});

/// Color for a line per the keyword ruleset, if any rule matches
pub fn classify_line(line: &str) -> Option<&'static str> {
    KEYWORD_RULES
        .iter()
        .find(|(rx, _)| rx.is_match(line))
        .map(|(_, color)| *color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_is_success() {
        assert_eq!(classify_line("accepted (1/0) diff 100k"), Some(COLOR_SUCCESS));
        assert_eq!(classify_line("ACCEPTED"), Some(COLOR_SUCCESS));
    }

    #[test]
    fn test_priority_order() {
        // "accepted" outranks "share" even though both match
        assert_eq!(classify_line("share accepted"), Some(COLOR_SUCCESS));
        // "rejected" outranks the generic error rule
        assert_eq!(classify_line("rejected: low difficulty share"), Some(COLOR_ERROR));
    }

    #[test]
    fn test_error_keywords() {
        assert_eq!(classify_line("connect error"), Some(COLOR_ERROR));
        assert_eq!(classify_line("login failed"), Some(COLOR_ERROR));
        assert_eq!(classify_line("unhandled exception"), Some(COLOR_ERROR));
    }

    #[test]
    fn test_telemetry_keywords() {
        assert_eq!(classify_line("new difficulty: 240k"), Some(COLOR_WARNING));
        assert_eq!(classify_line("hashrate report"), Some(COLOR_WARNING));
    }

    #[test]
    fn test_word_boundaries() {
        // "unaccepted" must not trip the accepted rule
        assert_eq!(classify_line("unaccepted data"), None);
        assert_eq!(classify_line("plain output"), None);
    }

    #[test]
    fn test_new_job_is_info() {
        assert_eq!(classify_line("new job from pool.example:3333"), Some(COLOR_INFO));
    }
}

use serde::{Deserialize, Serialize};

/// Length of the short abstract when the long one is a single line.
pub const SHORT_ABSTRACT_MAX_CHARS: usize = 200;

/// Long and short abstract of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstract {
    pub long_text: String,
    pub short_text: String,
}

impl Abstract {
    /// Build from rendered plain text. Returns `None` for blank input.
    pub fn from_plain_text(text: &str) -> Option<Self> {
        let long_text = text.trim();
        if long_text.is_empty() {
            return None;
        }

        let short_text = match long_text.find(is_line_break) {
            Some(pos) => long_text[..pos].to_string(),
            None => long_text.chars().take(SHORT_ABSTRACT_MAX_CHARS).collect(),
        };

        Some(Self {
            long_text: long_text.to_string(),
            short_text,
        })
    }
}

// Same boundaries as Unicode line splitting, \r\n included via \r.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_is_first_line() {
        let a = Abstract::from_plain_text("Harry Potter is a wizard.\n\nHe lives at Hogwarts.").unwrap();
        assert_eq!(a.long_text, "Harry Potter is a wizard.\n\nHe lives at Hogwarts.");
        assert_eq!(a.short_text, "Harry Potter is a wizard.");
    }

    #[test]
    fn test_single_line_truncated_to_200_chars() {
        let line = "é".repeat(250);
        let a = Abstract::from_plain_text(&line).unwrap();
        assert_eq!(a.short_text.chars().count(), SHORT_ABSTRACT_MAX_CHARS);
        assert_eq!(a.long_text, line);

        let short = Abstract::from_plain_text("Only one line.").unwrap();
        assert_eq!(short.short_text, "Only one line.");
    }

    #[test]
    fn test_crlf_and_leading_whitespace() {
        let a = Abstract::from_plain_text("  \n First\r\nSecond").unwrap();
        assert_eq!(a.long_text, "First\r\nSecond");
        assert_eq!(a.short_text, "First");
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(Abstract::from_plain_text("").is_none());
        assert!(Abstract::from_plain_text(" \n\t ").is_none());
    }
}

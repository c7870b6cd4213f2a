use once_cell::sync::Lazy;
use regex::Regex;

static PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\S+").expect("path pattern"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").expect("email pattern"));
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4,}").expect("digits pattern"));

/// Mask the parts of a window title that identify the person before it
/// leaves the machine.
///
/// * paths -> `/…`
/// * e-mail addresses -> `email@…`
/// * four or more digits -> `####`
pub fn sanitize_title(title: &str) -> String {
    let masked = PATH_RE.replace_all(title, "/…");
    let masked = EMAIL_RE.replace_all(&masked, "email@…");
    DIGITS_RE.replace_all(&masked, "####").into_owned()
}

/// Case-insensitive substring test.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate to at most `max_chars` characters on a char boundary, adding an
/// ellipsis when something was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_ignores_case() {
        assert!(contains_ci("(1) WhatsApp", "whatsapp"));
        assert!(!contains_ci("Terminal", "tv"));
        assert!(!contains_ci("anything", ""));
    }

    #[test]
    fn titles_are_masked() {
        assert_eq!(
            sanitize_title("report.md - /Users/ana/secret/report.md - VSCode"),
            "report.md - /… - VSCode"
        );
        assert_eq!(
            sanitize_title("Inbox (3) - ana.perez@example.com - Gmail"),
            "Inbox (3) - email@… - Gmail"
        );
        assert_eq!(
            sanitize_title("Account 12345678 - Bank"),
            "Account #### - Bank"
        );
        assert_eq!(sanitize_title("Terminal"), "Terminal");
        assert_eq!(sanitize_title("Room 101"), "Room 101");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("città di Vinci", 6), "città…");
    }
}

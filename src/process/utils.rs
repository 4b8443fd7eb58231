use scraper::ElementRef;

/// 1) Collapse runs of whitespace into single spaces and trim.
pub fn clean_str(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 2) All descendant text of an element, cleaned.
pub fn element_text(el: &ElementRef<'_>) -> String {
    clean_str(&el.text().collect::<String>())
}

/// A cell that is nothing but a day-of-month, e.g. "7" or "31".
pub fn is_day_number(s: &str) -> bool {
    is_all_digits(s) && s.parse::<u32>().map_or(false, |d| (1..=31).contains(&d))
}

/// A short (≤2 digit) number, the residue calendar widgets leave behind.
pub fn is_short_number(s: &str) -> bool {
    is_all_digits(s) && s.len() <= 2
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Make a string safe to embed in a file name: spaces become `_`,
/// path separators become `-`, anything else odd is dropped.
pub fn file_safe(s: &str) -> String {
    s.trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '/' | '\\' | ':' => Some('-'),
            c if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')') => Some(c),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_str_collapses_whitespace() {
        assert_eq!(clean_str("  CS (COMM)\n\t 12 / 2024 "), "CS (COMM) 12 / 2024");
        assert_eq!(clean_str("\n \n"), "");
    }

    #[test]
    fn test_day_numbers() {
        assert!(is_day_number("1"));
        assert!(is_day_number("31"));
        assert!(is_day_number("07"));
        assert!(!is_day_number("0"));
        assert!(!is_day_number("32"));
        assert!(!is_day_number("1a"));
        assert!(!is_day_number(""));
    }

    #[test]
    fn test_short_numbers() {
        assert!(is_short_number("99"));
        assert!(!is_short_number("100"));
        assert!(!is_short_number("1/2"));
    }

    #[test]
    fn test_file_safe() {
        assert_eq!(file_safe("Saket Courts Complex"), "Saket_Courts_Complex");
        assert_eq!(file_safe("10/16/2026"), "10-16-2026");
        assert_eq!(file_safe("CS (COMM) - CIVIL SUIT"), "CS_(COMM)_-_CIVIL_SUIT");
    }
}

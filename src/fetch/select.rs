//! Picking a dropdown option from what the portal actually offers.

/// Words that mark a `<select>` as the court / judge list.
const COURT_KEYWORDS: &[&str] = &["judge", "court", "ms.", "mr.", "sh.", "smt."];

/// Exact visible text first, then the first option containing `wanted`
/// (case-insensitive).
pub fn match_option<'a>(options: &'a [String], wanted: &str) -> Option<&'a str> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return None;
    }
    if let Some(exact) = options.iter().find(|o| o.trim() == wanted) {
        return Some(exact.as_str());
    }
    let needle = wanted.to_lowercase();
    options
        .iter()
        .find(|o| !o.trim().is_empty() && o.to_lowercase().contains(&needle))
        .map(String::as_str)
}

/// The code before `" - "`, e.g. `CS (COMM)` for `CS (COMM) - CIVIL SUIT (COMMERCIAL)`.
fn type_code(label: &str) -> &str {
    label.split(" - ").next().unwrap_or(label).trim()
}

/// Case types are listed as `<code> - <description>`; users often know only
/// one half, or the portal's description differs from ours.
pub fn match_case_type<'a>(options: &'a [String], wanted: &str) -> Option<&'a str> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return None;
    }
    if let Some(exact) = options.iter().find(|o| o.trim() == wanted) {
        return Some(exact.as_str());
    }

    let wanted_lc = wanted.to_lowercase();
    let wanted_code = type_code(wanted).to_lowercase();
    options
        .iter()
        .find(|o| {
            let text = o.trim().to_lowercase();
            if text.is_empty() {
                return false;
            }
            text == wanted_lc || type_code(&text) == wanted_code || text.contains(&wanted_lc)
        })
        .map(String::as_str)
}

pub fn is_court_option(text: &str) -> bool {
    let text = text.to_lowercase();
    COURT_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Whether a select's options look like the court / judge list.
pub fn lists_courts(options: &[String]) -> bool {
    options.iter().any(|o| is_court_option(o))
}

/// Date renderings to try, in order.
pub fn date_variants(date: &str) -> Vec<String> {
    let mut out = vec![date.to_string()];
    let dashed = date.replace('/', "-");
    if dashed != date {
        out.push(dashed);
    }
    out
}

/// A date field is taken as set once it reads back a full date.
pub fn date_accepted(read_back: &str) -> bool {
    read_back.trim().chars().count() >= 8
}

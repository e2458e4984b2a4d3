//! Date helpers: academic-year bucketing and certificate date parsing.

use chrono::{Datelike, NaiveDate};

/// Month (1-based) on whose first day a new academic year starts.
pub const ACADEMIC_YEAR_START_MONTH: u32 = 7;

/// Academic year label for a date, e.g. `2024-25`.
///
/// A date on or after 1 July of year Y belongs to `Y-(Y+1 mod 100)`;
/// an earlier date belongs to `(Y-1)-(Y mod 100)`.
pub fn academic_year(date: NaiveDate) -> String {
    let start_year = if date.month() >= ACADEMIC_YEAR_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{:02}", start_year, (start_year + 1).rem_euclid(100))
}

const NUMERIC_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];
const WORD_FORMATS: &[&str] = &["%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y"];

/// Parse a date as it commonly appears on certificates.
///
/// Numeric dates are read day-first (`10/07/2024` is 10 July). Month names
/// may be full or abbreviated, with or without ordinal suffixes and commas.
pub fn parse_certificate_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in NUMERIC_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    let words = normalize_words(trimmed);
    WORD_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&words, fmt).ok())
}

/// Number of calendar days covered by `start..=end`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Option<i64> {
    if end < start {
        return None;
    }
    Some((end - start).num_days() + 1)
}

/// "10th July, 2024" → "10 July 2024".
fn normalize_words(s: &str) -> String {
    s.replace(',', " ")
        .split_whitespace()
        .map(strip_ordinal)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_ordinal(word: &str) -> &str {
    let digits = word.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits == word.len() {
        return word;
    }
    let suffix = &word[digits..];
    if ["st", "nd", "rd", "th"]
        .iter()
        .any(|s| suffix.eq_ignore_ascii_case(s))
    {
        &word[..digits]
    } else {
        word
    }
}

//! Publish-date normalization for free-text date strings.
//!
//! Real pages publish dates in wildly inconsistent shapes: `"15 января 2025,
//! 13:41"`, `"Сегодня, 15:31"`, `"08.04.25"`, or `"8 апреля"` with no year at
//! all. This module turns such text into a [`NaiveDate`] or reports it as
//! unparseable (`None`), never an error, because a bad date on one record
//! must not abort the rest of the batch.
//!
//! # Normalization steps
//!
//! 1. Lowercase and trim; strip embedded `HH:MM` clock substrings and commas
//!    (only the calendar date is retained).
//! 2. Short-circuit on relative-day idioms: `"сегодня"` → today, `"вчера"` →
//!    yesterday, found anywhere in the string.
//! 3. Replace Russian month names with their numeric form, append the current
//!    year when the text carries none, then try a fixed, ordered list of
//!    absolute formats.
//!
//! When a source configures an explicit `datePattern`, the pattern is compiled
//! into a regex and only the first matching substring is parsed, which
//! tolerates surrounding noise such as a trailing weekday name.

use chrono::{Datelike, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

/// `HH:MM` clock fragments are stripped before date parsing.
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").unwrap());
/// A 4-digit year anywhere in the string.
static FULL_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());
/// A 2-digit year candidate at a word boundary.
static SHORT_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2}\b").unwrap());

/// Relative-day idioms and their offset from today, checked before any
/// absolute format. Order is irrelevant; the first token found wins.
const RELATIVE_DAYS: [(&str, i64); 2] = [("сегодня", 0), ("вчера", -1)];

/// Russian month names, genitive before nominative so the genitive form is
/// consumed first (`"мая"` would otherwise be eaten by `"май"`).
static MONTHS: [(&str, &str, &str); 12] = [
    ("января", "январь", "01"),
    ("февраля", "февраль", "02"),
    ("марта", "март", "03"),
    ("апреля", "апрель", "04"),
    ("мая", "май", "05"),
    ("июня", "июнь", "06"),
    ("июля", "июль", "07"),
    ("августа", "август", "08"),
    ("сентября", "сентябрь", "09"),
    ("октября", "октябрь", "10"),
    ("ноября", "ноябрь", "11"),
    ("декабря", "декабрь", "12"),
];

/// Absolute formats tried in order after month-name replacement. Covers
/// day-month-name-year (full and 2-digit year, via the numeric substitution),
/// day-numeric-month-year, and the dotted forms. `%y` comes before `%Y`
/// within each shape: chrono's `%Y` happily parses a 2-digit number as a
/// first-century year, while `%y` fails cleanly on a 4-digit one.
const FORMATS: [&str; 4] = ["%d %m %y", "%d %m %Y", "%d.%m.%y", "%d.%m.%Y"];

/// Normalize a raw date string into a calendar date.
///
/// With `pattern` set (selector-driven mode) the explicit chrono-style format
/// is used to locate and parse the date inside the text; otherwise the fixed
/// format list is tried in order.
///
/// # Arguments
///
/// * `raw` - The date text as extracted from the page
/// * `pattern` - Optional chrono format pattern from the source's `datePattern`
///
/// # Returns
///
/// The parsed date, or `None` when nothing matches. Callers treat `None` as
/// "skip this record", never as a fatal error.
pub fn normalize(raw: &str, pattern: Option<&str>) -> Option<NaiveDate> {
    let cleaned = strip_time_and_commas(&raw.to_lowercase());

    if let Some(offset) = relative_day_offset(&cleaned) {
        return Some(Local::now().date_naive() + Duration::days(offset));
    }

    let result = match pattern {
        Some(p) => parse_with_pattern(&cleaned, p),
        None => parse_with_known_formats(&cleaned),
    };

    if result.is_none() {
        warn!(date = %cleaned, "Unable to recognize date");
    }
    result
}

/// Remove `HH:MM` fragments and commas, then trim.
fn strip_time_and_commas(s: &str) -> String {
    TIME_RE.replace_all(s, "").replace(',', "").trim().to_string()
}

/// Offset in days if the text contains a relative-day idiom.
fn relative_day_offset(s: &str) -> Option<i64> {
    RELATIVE_DAYS
        .iter()
        .find(|(token, _)| s.contains(token))
        .map(|&(_, offset)| offset)
}

/// Matches a day number followed by a Russian month name. Substitution is
/// positional on purpose: a month name parses only in the month slot of a
/// day-month date, so `"январь, 1"` stays unparseable while `"1 января"`
/// becomes numeric.
static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    let names = MONTHS
        .iter()
        .flat_map(|(genitive, nominative, _)| [*genitive, *nominative])
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(\d{{1,2}})\s+({names})")).unwrap()
});

/// Replace a `day month-name` pair with its `day month-number` form.
fn replace_month_names(s: &str) -> String {
    DAY_MONTH_RE
        .replace_all(s, |caps: &Captures| {
            let number = MONTHS
                .iter()
                .find(|(genitive, nominative, _)| *genitive == &caps[2] || *nominative == &caps[2])
                .map(|&(_, _, number)| number)
                .unwrap_or("00");
            format!("{} {}", &caps[1], number)
        })
        .to_string()
}

/// True when the text carries neither a 4-digit nor a word-bounded 2-digit
/// number that could serve as a year.
fn has_no_year(s: &str) -> bool {
    !FULL_YEAR_RE.is_match(s) && !SHORT_YEAR_RE.is_match(s)
}

fn parse_with_known_formats(cleaned: &str) -> Option<NaiveDate> {
    let mut text = cleaned.to_string();
    // Year detection runs before month substitution: the numeric month the
    // substitution introduces must not be mistaken for a 2-digit year.
    if has_no_year(&text) {
        text = format!("{} {}", text, Local::now().year());
    }
    text = replace_month_names(&text);

    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
}

/// Parse using an explicit chrono-style pattern.
///
/// The pattern is compiled into a regex (`%d`/`%e`/`%m` → 1-2 digits, `%Y` →
/// 4 digits, `%y` → 2 digits) and searched against the text, so noise around
/// the date is ignored. A pattern without a year token gets ` %Y` appended and
/// the current year glued onto the matched substring before parsing.
fn parse_with_pattern(cleaned: &str, pattern: &str) -> Option<NaiveDate> {
    // %B is served by the same month-name substitution as the format list.
    let pattern = pattern.replace("%B", "%m");
    let text = replace_month_names(cleaned);

    let matcher = pattern_to_regex(&pattern)?;
    let matched = matcher.find(&text)?.as_str().to_string();

    if pattern.contains("%Y") || pattern.contains("%y") {
        NaiveDate::parse_from_str(&matched, &pattern).ok()
    } else {
        let with_year = format!("{} {}", matched, Local::now().year());
        NaiveDate::parse_from_str(&with_year, &format!("{} %Y", pattern)).ok()
    }
}

/// Translate a chrono format pattern into a matching regex.
fn pattern_to_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('d') | Some('e') | Some('m') => expr.push_str(r"\d{1,2}"),
                Some('Y') => expr.push_str(r"\d{4}"),
                Some('y') => expr.push_str(r"\d{2}"),
                Some(other) => expr.push_str(&regex::escape(&other.to_string())),
                None => return None,
            }
        } else {
            expr.push_str(&regex::escape(&c.to_string()));
        }
    }
    Regex::new(&expr).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, NaiveDate};

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn test_normalize_strips_time_and_commas() {
        assert_eq!(
            normalize("15 января 2025, 13:41", None),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(normalize("Сегодня, 15:31", None), Some(today()));
    }

    #[test]
    fn test_normalize_appends_current_year_when_missing() {
        let current_year = Local::now().year();
        assert_eq!(
            normalize("8 апреля", None),
            NaiveDate::from_ymd_opt(current_year, 4, 8)
        );
    }

    #[test]
    fn test_normalize_relative_days_ignore_case_and_trailing_text() {
        assert_eq!(normalize("Сегодня", None), Some(today()));
        assert_eq!(normalize("Вчера", None), Some(today() - Duration::days(1)));
        // The relative idiom short-circuits regardless of trailing content.
        assert_eq!(
            normalize("Вчера, 10 Июля", None),
            Some(today() - Duration::days(1))
        );
    }

    #[test]
    fn test_normalize_known_absolute_formats() {
        assert_eq!(
            normalize("15 января 2025", None),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(
            normalize("8 апреля 25", None),
            NaiveDate::from_ymd_opt(2025, 4, 8)
        );
        assert_eq!(
            normalize("15.01.2025", None),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(
            normalize("08.04.25", None),
            NaiveDate::from_ymd_opt(2025, 4, 8)
        );
    }

    #[test]
    fn test_normalize_unsupported_shapes_return_none() {
        assert_eq!(normalize("01.01 2025", None), None);
        assert_eq!(normalize("Январь, 1", None), None);
        assert_eq!(normalize("", None), None);
    }

    #[test]
    fn test_normalize_with_explicit_pattern() {
        assert_eq!(
            normalize("15.01.2025", Some("%d.%m.%Y")),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        // Noise around the date is tolerated in pattern mode.
        assert_eq!(
            normalize("опубликовано 15.01.2025 в эфире", Some("%d.%m.%Y")),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
    }

    #[test]
    fn test_normalize_pattern_without_year_uses_current_year() {
        let current_year = Local::now().year();
        // Trailing weekday noise after a yearless date.
        assert_eq!(
            normalize("8 апреля, понедельник", Some("%d %B")),
            NaiveDate::from_ymd_opt(current_year, 4, 8)
        );
    }

    #[test]
    fn test_normalize_pattern_with_no_match_returns_none() {
        assert_eq!(normalize("не дата", Some("%d.%m.%Y")), None);
    }
}

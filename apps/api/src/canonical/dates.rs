//! Lenient parsing of the free-form dates found on resumes.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})(?:-\d{1,2})?$").expect("valid regex"));
static SLASH_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{4})$").expect("valid regex"));
static NAMED_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{4})\b",
    )
    .expect("valid regex")
});
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid regex"));

/// Parses a resume date into the first day of its month.
///
/// Accepts `2020-01`, `2020-01-15`, `01/2020`, `Jan 2020`, `January 2020`,
/// and falls back to the first month-year or bare year found anywhere in the
/// string ("Summer 2019" → 2019-01-01). Returns `None` for "Present" and for
/// strings with no recognizable date.
pub fn parse_resume_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_end_matches('.');
    if s.is_empty() || is_present(s) {
        return None;
    }

    if let Some(caps) = ISO_MONTH.captures(s) {
        return month_start(caps[1].parse().ok()?, caps[2].parse().ok()?);
    }
    if let Some(caps) = SLASH_MONTH.captures(s) {
        return month_start(caps[2].parse().ok()?, caps[1].parse().ok()?);
    }
    if let Some(caps) = NAMED_MONTH.captures(s) {
        return month_start(caps[2].parse().ok()?, month_number(&caps[1])?);
    }
    YEAR.captures(s)
        .and_then(|caps| caps[1].parse().ok())
        .and_then(|year| month_start(year, 1))
}

/// True for the markers used on an ongoing role.
pub fn is_present(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "present" | "current" | "now" | "today" | "ongoing"
    )
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_parses_iso_month() {
        assert_eq!(parse_resume_date("2019-06"), Some(ymd(2019, 6)));
        assert_eq!(parse_resume_date("2019-06-20"), Some(ymd(2019, 6)));
    }

    #[test]
    fn test_parses_slash_month() {
        assert_eq!(parse_resume_date("03/2021"), Some(ymd(2021, 3)));
    }

    #[test]
    fn test_parses_named_month() {
        assert_eq!(parse_resume_date("Apr 2024"), Some(ymd(2024, 4)));
        assert_eq!(parse_resume_date("September 2018"), Some(ymd(2018, 9)));
        assert_eq!(parse_resume_date("Sept. 2018"), Some(ymd(2018, 9)));
    }

    #[test]
    fn test_parses_bare_year_and_embedded_year() {
        assert_eq!(parse_resume_date("2015"), Some(ymd(2015, 1)));
        assert_eq!(parse_resume_date("Summer 2019"), Some(ymd(2019, 1)));
    }

    #[test]
    fn test_present_and_garbage_are_none() {
        assert_eq!(parse_resume_date("Present"), None);
        assert_eq!(parse_resume_date(""), None);
        assert_eq!(parse_resume_date("a while ago"), None);
        assert!(is_present(" current "));
    }

    #[test]
    fn test_invalid_month_is_none() {
        assert_eq!(parse_resume_date("2020-13"), None);
    }
}

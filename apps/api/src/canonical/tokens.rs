//! Extraction of the tokens a resume must never lose: quantities, dates, and links.
//!
//! Quantified tokens are the numbers, percentages, currency amounts, and dates
//! found in text. Links are URLs, including bare `linkedin.com/...` style paths.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    Currency,
    Percentage,
    Date,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantifiedToken {
    pub kind: QuantityKind,
    /// The token as it appears in the source text.
    pub text: String,
}

impl QuantifiedToken {
    /// Lowercase, whitespace-free form used for tracing across fields.
    pub fn normalized(&self) -> String {
        compact(&self.text)
    }
}

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)
        (?P<currency>[$€£₹]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:k|m|bn|b|million|billion)\b)?)
        | (?P<percent>\d+(?:\.\d+)?\s?%)
        | (?P<date>
              \b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{4}\b
            | \b\d{1,2}/\d{4}\b
            | \b\d{4}-\d{1,2}\b
            | \b(?:19|20)\d{2}\b
          )
        | (?P<number>\d+(?:[.,]\d+)*(?:[kmbx]\b|\+)?)
        ",
    )
    .expect("valid regex")
});

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:https?://|www\.)[^\s<>"'()]+|\b(?:[a-z0-9-]+\.)*(?:linkedin\.com|github\.com|huggingface\.co|coursera\.org)/[^\s<>"'()]*"#,
    )
    .expect("valid regex")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{2,4}\)[\s.-]?)?\d{3,5}[\s.-]?\d{3,4}(?:[\s.-]?\d{3,4})?")
        .expect("valid regex")
});

/// Extracts every quantified token from `text`, skipping URL spans (links are
/// traced separately and carry their digits with them).
pub fn extract_quantified(text: &str) -> Vec<QuantifiedToken> {
    extract_quantified_spans(text)
        .into_iter()
        .map(|(_, token)| token)
        .collect()
}

/// Like `extract_quantified`, with each token's byte range in `text`.
pub fn extract_quantified_spans(text: &str) -> Vec<(Range<usize>, QuantifiedToken)> {
    let url_spans: Vec<Range<usize>> = URL.find_iter(text).map(|m| m.range()).collect();

    QUANTITY
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if within_any(&whole.range(), &url_spans) {
                return None;
            }
            let kind = if caps.name("currency").is_some() {
                QuantityKind::Currency
            } else if caps.name("percent").is_some() {
                QuantityKind::Percentage
            } else if caps.name("date").is_some() {
                QuantityKind::Date
            } else {
                QuantityKind::Number
            };
            let token = QuantifiedToken {
                kind,
                text: whole.as_str().trim().to_string(),
            };
            Some((whole.range(), token))
        })
        .collect()
}

/// True when `inner` lies entirely inside one of `spans`.
pub fn within_any(inner: &Range<usize>, spans: &[Range<usize>]) -> bool {
    spans
        .iter()
        .any(|span| span.start <= inner.start && inner.end <= span.end)
}

/// Number of quantified tokens in a set of strings.
pub fn count_quantified<'a>(texts: impl IntoIterator<Item = &'a str>) -> usize {
    texts
        .into_iter()
        .map(|t| extract_quantified(t).len())
        .sum()
}

/// Extracts URLs in order of appearance, trailing punctuation removed.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL.find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
                .to_string()
        })
        .filter(|u| !u.is_empty())
        .collect()
}

/// Comparison form of a URL: lowercase, no scheme, no `www.`, no trailing slash.
pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

pub fn find_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Phone-like sequences carrying 10 to 15 digits, with their byte ranges.
pub fn phone_spans(text: &str) -> Vec<(Range<usize>, &str)> {
    PHONE
        .find_iter(text)
        .filter(|m| (10..=15).contains(&digits(m.as_str()).len()))
        .map(|m| (m.range(), m.as_str()))
        .collect()
}

/// First phone-like sequence carrying 10 to 15 digits.
pub fn find_phone(text: &str) -> Option<String> {
    phone_spans(text)
        .into_iter()
        .next()
        .map(|(_, phone)| phone.trim().to_string())
}

pub fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Two phone numbers are the same line when their digit sequences agree,
/// ignoring a country-code prefix on either side.
pub fn same_phone(a: &str, b: &str) -> bool {
    let (a, b) = (digits(a), digits(b));
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= 10 && long.ends_with(&short)
}

/// Lowercases and removes all whitespace.
pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercases and collapses every whitespace run to a single space.
pub fn fold_spaces(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True when `needle` occurs in `haystack` without being glued to extra digits
/// on a digit boundary ("3" is not found inside "2023"). Both sides must be
/// folded the same way (`compact` or `fold_spaces`).
pub fn contains_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let starts_with_digit = needle.chars().next().is_some_and(|c| c.is_ascii_digit());
    let ends_with_digit = needle.chars().last().is_some_and(|c| c.is_ascii_digit());

    haystack.match_indices(needle).any(|(idx, _)| {
        let before_ok = !starts_with_digit
            || !haystack[..idx]
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_digit());
        let after_ok = !ends_with_digit
            || !haystack[idx + needle.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit());
        before_ok && after_ok
    })
}

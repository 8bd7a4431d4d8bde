use std::collections::HashSet;
use std::ops::{Deref, Range};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::canonical::dates::parse_resume_date;
use crate::canonical::tokens::{
    compact, contains_token, extract_quantified_spans, extract_urls, find_email, find_phone,
    fold_spaces, normalize_url, phone_spans, same_phone, within_any, QuantifiedToken, QuantityKind,
};
use crate::models::resume::{
    ContactInfo, EducationEntry, ExperienceEntry, LinkLabel, Links, ProjectEntry, ResumeRecord,
    SkillCategory, SkillGroups, StructuredGuess,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("resume has no content: raw text and structured data are both empty")]
    Empty,

    #[error("{} source token(s) missing from the structured resume: {}", missing.len(), missing.join(", "))]
    DataLoss { missing: Vec<String> },
}

/// A validated, immutable resume record.
///
/// Only `validate` builds one, so holding a `CanonicalResume` means every
/// quantified token and link of the source text is present in the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalResume(ResumeRecord);

impl CanonicalResume {
    pub fn record(&self) -> &ResumeRecord {
        &self.0
    }
}

impl Deref for CanonicalResume {
    type Target = ResumeRecord;

    fn deref(&self) -> &ResumeRecord {
        &self.0
    }
}

/// Builds the canonical record from raw extracted text and the parser's
/// best-effort structure.
///
/// Fails with `DataLoss` when a number, percentage, currency amount, date or
/// link found in `raw_text` cannot be traced to any field of the record.
pub fn validate(raw_text: &str, guess: StructuredGuess) -> Result<CanonicalResume, ValidationError> {
    let mut record = sanitize_guess(guess);

    if raw_text.trim().is_empty() && record == ResumeRecord::default() {
        return Err(ValidationError::Empty);
    }

    recover_contact(&mut record.contact_info, raw_text);
    harvest_links(&mut record.links, raw_text);

    let missing = untraced_tokens(raw_text, &record);
    if !missing.is_empty() {
        warn!(missing = ?missing, "Structured resume dropped source tokens");
        return Err(ValidationError::DataLoss { missing });
    }

    debug!(
        experience = record.experience.len(),
        projects = record.projects.len(),
        links = record.links.len(),
        "Canonical resume validated"
    );
    Ok(CanonicalResume(record))
}

// ────────────────────────────────────────────────────────────────────────────
// Sanitization
// ────────────────────────────────────────────────────────────────────────────

/// Strips control characters, collapses whitespace runs and trims.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|s| sanitize_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn sanitize_guess(guess: StructuredGuess) -> ResumeRecord {
    let contact = guess.contact_info;
    let mut links = Links::new();
    for (label, url) in guess.links {
        let url = sanitize_text(&url);
        if url.is_empty() {
            continue;
        }
        let label = LinkLabel::from_label(&label).or_else(|| LinkLabel::from_url(&url));
        insert_link(&mut links, label, url);
    }

    ResumeRecord {
        contact_info: ContactInfo {
            full_name: sanitize_text(&contact.full_name),
            email: sanitize_text(&contact.email),
            phone: sanitize_text(&contact.phone),
            location: sanitize_text(&contact.location),
        },
        links,
        summary: sanitize_text(&guess.summary),
        education: guess
            .education
            .into_iter()
            .map(|e| EducationEntry {
                institution: sanitize_text(&e.institution),
                degree: sanitize_text(&e.degree),
                field: sanitize_text(&e.field),
                location: sanitize_text(&e.location),
                graduation_date: sanitize_text(&e.graduation_date),
                gpa: sanitize_text(&e.gpa),
            })
            .collect(),
        experience: guess
            .experience
            .into_iter()
            .map(|e| ExperienceEntry {
                company: sanitize_text(&e.company),
                position: sanitize_text(&e.position),
                location: sanitize_text(&e.location),
                start_date: sanitize_text(&e.start_date),
                end_date: sanitize_text(&e.end_date),
                achievements: sanitize_list(e.achievements),
            })
            .collect(),
        projects: guess
            .projects
            .into_iter()
            .map(|p| ProjectEntry {
                title: sanitize_text(&p.title),
                description: sanitize_text(&p.description),
                technologies: sanitize_list(p.technologies),
                bullets: sanitize_list(p.bullets),
            })
            .collect(),
        certifications: sanitize_list(guess.certifications),
        skills: SkillGroups(
            guess
                .skills
                .0
                .into_iter()
                .map(|c| SkillCategory {
                    name: sanitize_text(&c.name),
                    items: sanitize_list(c.items),
                })
                .filter(|c| !c.name.is_empty())
                .collect(),
        ),
        languages: sanitize_list(guess.languages),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Contact and links
// ────────────────────────────────────────────────────────────────────────────

fn recover_contact(contact: &mut ContactInfo, raw_text: &str) {
    if contact.email.is_empty() {
        if let Some(email) = find_email(raw_text) {
            contact.email = email;
        }
    }
    if contact.phone.is_empty() {
        if let Some(phone) = find_phone(raw_text) {
            contact.phone = phone;
        }
    }
}

/// Adds every URL of the raw text that the structured guess missed.
fn harvest_links(links: &mut Links, raw_text: &str) {
    for url in extract_urls(raw_text) {
        let label = LinkLabel::from_url(&url);
        insert_link(links, label, url);
    }
}

/// Inserts a link unless its normalized URL is already present. A taken or
/// unrecognized label falls back to the next free `Website` slot.
fn insert_link(links: &mut Links, label: Option<LinkLabel>, url: String) {
    let normalized = normalize_url(&url);
    if links.values().any(|existing| normalize_url(existing) == normalized) {
        return;
    }
    let label = match label {
        Some(label) if !links.contains_key(&label) => Some(label),
        _ => next_website_label(links),
    };
    match label {
        Some(label) => {
            links.insert(label, url);
        }
        None => warn!(url = %url, "No free link label left"),
    }
}

fn next_website_label(links: &Links) -> Option<LinkLabel> {
    (1..=u8::MAX)
        .map(LinkLabel::Website)
        .find(|label| !links.contains_key(label))
}

// ────────────────────────────────────────────────────────────────────────────
// Token tracing
// ────────────────────────────────────────────────────────────────────────────

/// Source tokens (quantities and links) with no trace in the record,
/// deduplicated, in order of first appearance. A phone number is traced by its
/// digits against the contact phone.
fn untraced_tokens(raw_text: &str, record: &ResumeRecord) -> Vec<String> {
    let flat = record.searchable_text();
    let haystack_spaced = fold_spaces(&flat);
    let haystack_compact = compact(&flat);
    let record_dates = record_dates(record);
    let contact_phone = record.contact_info.phone.as_str();
    let phones: Vec<Range<usize>> = phone_spans(raw_text)
        .into_iter()
        .filter(|(_, phone)| same_phone(phone, contact_phone))
        .map(|(span, _)| span)
        .collect();

    let mut seen = HashSet::new();
    let mut missing = Vec::new();

    for (span, token) in extract_quantified_spans(raw_text) {
        if within_any(&span, &phones) || !seen.insert(token.normalized()) {
            continue;
        }
        let traced = contains_token(&haystack_spaced, &fold_spaces(&token.text))
            || contains_token(&haystack_compact, &token.normalized())
            || matches_record_date(&token, &record_dates);
        if !traced {
            missing.push(token.text);
        }
    }

    let known_links: HashSet<String> = record.links.values().map(|u| normalize_url(u)).collect();
    for url in extract_urls(raw_text) {
        let normalized = normalize_url(&url);
        if !known_links.contains(&normalized) && seen.insert(normalized) {
            missing.push(url);
        }
    }

    missing
}

fn record_dates(record: &ResumeRecord) -> Vec<NaiveDate> {
    record
        .experience
        .iter()
        .flat_map(|e| [e.start_date.as_str(), e.end_date.as_str()])
        .chain(record.education.iter().map(|e| e.graduation_date.as_str()))
        .filter_map(parse_resume_date)
        .collect()
}

/// A date written differently in the record ("Apr 2024" vs "2024-04") still
/// counts as preserved.
fn matches_record_date(token: &QuantifiedToken, record_dates: &[NaiveDate]) -> bool {
    if token.kind != QuantityKind::Date {
        return false;
    }
    let Some(date) = parse_resume_date(&token.text) else {
        return false;
    };
    let year_only = token.text.trim().chars().all(|c| c.is_ascii_digit());
    record_dates.iter().any(|d| {
        d.year() == date.year() && (year_only || d.month() == date.month())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::models::resume::SectionKey;

    /// Round-trips a typed record back into parser input.
    fn guess_from_record(record: &ResumeRecord) -> StructuredGuess {
        StructuredGuess {
            contact_info: record.contact_info.clone(),
            links: record
                .links
                .iter()
                .map(|(label, url)| (label.to_string(), url.clone()))
                .collect::<BTreeMap<_, _>>(),
            summary: record.summary.clone(),
            education: record.education.clone(),
            experience: record.experience.clone(),
            projects: record.projects.clone(),
            certifications: record.certifications.clone(),
            skills: record.skills.clone(),
            languages: record.languages.clone(),
        }
    }

    fn guess() -> StructuredGuess {
        StructuredGuess {
            contact_info: ContactInfo {
                full_name: "Jane Doe".to_string(),
                ..Default::default()
            },
            summary: "Data engineer with 6 years of experience".to_string(),
            experience: vec![ExperienceEntry {
                company: "Acme".to_string(),
                position: "Senior Data Engineer".to_string(),
                start_date: "2019-06".to_string(),
                end_date: "Present".to_string(),
                achievements: vec![
                    "Cut pipeline cost by 40% saving $50,000".to_string(),
                    "Led 3 engineers".to_string(),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    const RAW: &str = "Jane Doe\njane@example.com | +1 555-123-4567\nlinkedin.com/in/janedoe\n\
        Data engineer with 6 years of experience\nAcme, Senior Data Engineer, Jun 2019 - Present\n\
        - Cut pipeline cost by 40% saving $50,000\n- Led 3 engineers";

    #[test]
    fn test_validate_preserves_all_nine_sections() {
        let canonical = validate("", guess()).unwrap();
        let value = serde_json::to_value(&canonical).unwrap();
        for key in SectionKey::ALL {
            assert!(value.get(key.as_str()).is_some(), "missing {key}");
        }
        assert_eq!(value["languages"], serde_json::json!([]));
    }

    #[test]
    fn test_validate_recovers_contact_and_links() {
        let canonical = validate(RAW, guess()).unwrap();
        assert_eq!(canonical.contact_info.email, "jane@example.com");
        assert_eq!(canonical.contact_info.phone, "+1 555-123-4567");
        assert_eq!(
            canonical.links.get(&LinkLabel::LinkedIn).map(String::as_str),
            Some("linkedin.com/in/janedoe")
        );
    }

    #[test]
    fn test_validate_accepts_reformatted_dates() {
        // Raw text says "Jun 2019", the record stores "2019-06".
        assert!(validate(RAW, guess()).is_ok());
    }

    #[test]
    fn test_dropped_metric_is_data_loss() {
        let mut g = guess();
        g.experience[0].achievements[0] = "Cut pipeline cost saving $50,000".to_string();
        let err = validate(RAW, g).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DataLoss {
                missing: vec!["40%".to_string()]
            }
        );
    }

    fn phone_guess(phone: &str) -> StructuredGuess {
        StructuredGuess {
            contact_info: ContactInfo {
                full_name: "Jane".to_string(),
                phone: phone.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_reformatted_phone_is_traced_by_digits() {
        let canonical = validate("Jane\n555.123.4567", phone_guess("(555) 123-4567")).unwrap();
        assert_eq!(canonical.contact_info.phone, "(555) 123-4567");

        assert!(validate("Jane\n(555) 123-4567", phone_guess("+1 555.123.4567")).is_ok());
    }

    #[test]
    fn test_different_phone_is_still_data_loss() {
        let err = validate("Jane\n555.123.4567", phone_guess("(555) 999-0000")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DataLoss {
                missing: vec!["555.123.4567".to_string()]
            }
        );
    }

    #[test]
    fn test_digit_inside_larger_number_does_not_count() {
        let mut g = guess();
        g.experience[0].achievements[1] = "Led engineers".to_string();
        g.summary = "Data engineer with 6 years of experience since 2013".to_string();
        let err = validate(RAW, g).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DataLoss {
                missing: vec!["3".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(
            validate("  ", StructuredGuess::default()).unwrap_err(),
            ValidationError::Empty
        );
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  Led\u{0007} 3\n\n engineers  "), "Led 3 engineers");
    }

    #[test]
    fn test_empty_list_items_and_links_are_dropped() {
        let mut g = guess();
        g.languages = vec!["English".to_string(), "   ".to_string()];
        g.links.insert("GitHub".to_string(), " ".to_string());
        let canonical = validate("", g).unwrap();
        assert_eq!(canonical.languages, vec!["English"]);
        assert!(canonical.links.is_empty());
    }

    #[test]
    fn test_unknown_link_providers_become_websites() {
        let mut g = guess();
        g.links.insert("Portfolio".to_string(), "https://jane.dev".to_string());
        g.links.insert("Blog".to_string(), "https://blog.jane.dev".to_string());
        g.links.insert("git hub".to_string(), "https://github.com/jane".to_string());
        let canonical = validate("", g).unwrap();
        let labels: Vec<String> = canonical.links.keys().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["GitHub", "Website", "Website 2"]);
    }

    #[test]
    fn test_duplicate_urls_are_stored_once() {
        let mut g = guess();
        g.links
            .insert("LinkedIn".to_string(), "https://www.linkedin.com/in/janedoe/".to_string());
        let canonical = validate(RAW, g).unwrap();
        assert_eq!(canonical.links.len(), 1);
        assert_eq!(
            canonical.links[&LinkLabel::LinkedIn],
            "https://www.linkedin.com/in/janedoe/"
        );
    }

    #[test]
    fn test_guess_from_record_round_trips_through_validate() {
        let canonical = validate(RAW, guess()).unwrap();
        let again = validate(RAW, guess_from_record(canonical.record())).unwrap();
        assert_eq!(canonical, again);
    }
}

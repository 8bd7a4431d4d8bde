//! ATS scoring of a merged resume against a job description.
//!
//! `ats_score = round(100 × (0.40·skills + 0.30·keywords + 0.20·title + 0.10·experience))`
//!
//! Pure: the reference date for "Present" roles comes from `ScoringSettings`,
//! so identical inputs always give identical reports.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strsim::jaro_winkler;
use tracing::debug;

use crate::ats::recommendations::{recommend, Components, Signals};
use crate::ats::tokenize::{
    is_significant, norms, tokenize, vocabulary_kind, TermKind, Token, TokenIndex, VOCABULARY,
};
use crate::canonical::dates::{is_present, parse_resume_date};
use crate::merge::MergedResume;
use crate::models::resume::{ExperienceEntry, ResumeRecord};

pub const SKILLS_WEIGHT: f32 = 0.40;
pub const KEYWORDS_WEIGHT: f32 = 0.30;
pub const TITLE_WEIGHT: f32 = 0.20;
pub const EXPERIENCE_WEIGHT: f32 = 0.10;

/// Title similarity when the job description states no title.
const NEUTRAL_TITLE_SCORE: f32 = 0.5;
/// Years credited to an entry without a usable date range.
const UNDATED_ENTRY_YEARS: f32 = 0.5;

const EMPTY_JD_RECOMMENDATION: &str =
    "The job description has no scorable keywords; paste the full posting to get a score";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringSettings {
    /// Years of experience at which the experience component saturates.
    pub target_years: f32,
    /// Reference date for roles that are still ongoing.
    pub as_of: NaiveDate,
}

/// Percent per component, 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub skills: u8,
    pub keywords: u8,
    pub title: u8,
    pub experience: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtsReport {
    pub ats_score: u8,
    /// Always has `technical` and `business`, each in job-description order.
    pub keyword_matches: BTreeMap<String, Vec<String>>,
    pub missing_keywords: Vec<String>,
    pub recommendations: Vec<String>,
    pub score_breakdown: ScoreBreakdown,
}

/// A vocabulary term the posting names, as written there.
#[derive(Debug, Clone)]
struct SkillTerm {
    display: String,
    tokens: Vec<String>,
}

/// A significant token of the posting. `vocab` is the kind of the vocabulary
/// term it was read as part of, if any.
#[derive(Debug, Clone)]
struct JdKeyword {
    display: String,
    norm: String,
    vocab: Option<TermKind>,
}

#[derive(Debug, Default)]
struct JdTerms {
    skills: Vec<SkillTerm>,
    keywords: Vec<JdKeyword>,
}

pub fn score(resume: &MergedResume, job_description: &str, settings: &ScoringSettings) -> AtsReport {
    score_record(resume.record(), job_description, settings)
}

fn score_record(record: &ResumeRecord, job_description: &str, settings: &ScoringSettings) -> AtsReport {
    let JdTerms {
        skills: skill_terms,
        keywords,
    } = jd_terms(&tokenize(job_description));
    if keywords.is_empty() {
        return unscorable();
    }

    let resume_index = TokenIndex::new(&record.searchable_text());
    let skills_index = TokenIndex::new(
        &record
            .skills
            .all_items()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" \n "),
    );

    // Skills: vocabulary terms of the posting found in the skills section.
    let missing_skills: Vec<String> = skill_terms
        .iter()
        .filter(|k| !skills_index.contains_phrase(&k.tokens))
        .map(|k| k.display.clone())
        .collect();
    let skills = if skill_terms.is_empty() {
        0.0
    } else {
        (skill_terms.len() - missing_skills.len()) as f32 / skill_terms.len() as f32
    };

    // Keywords: significant tokens of the posting found anywhere in the resume.
    let mut technical = Vec::new();
    let mut business = Vec::new();
    let mut missing_keywords = Vec::new();
    for keyword in &keywords {
        if resume_index.contains(&keyword.norm) {
            match classify(keyword) {
                TermKind::Technical => technical.push(keyword.display.clone()),
                TermKind::Business => business.push(keyword.display.clone()),
            }
        } else {
            missing_keywords.push(keyword.display.clone());
        }
    }
    let keyword_overlap = (technical.len() + business.len()) as f32 / keywords.len() as f32;

    let jd_title = extract_jd_title(job_description);
    let title = match (&jd_title, most_recent_position(&record.experience)) {
        (None, _) => NEUTRAL_TITLE_SCORE,
        (Some(_), None) => 0.0,
        (Some(jd), Some(position)) => title_similarity(jd, position),
    };

    let total_years = total_years(&record.experience, settings.as_of);
    let experience = if settings.target_years <= 0.0 {
        1.0
    } else {
        (total_years / settings.target_years).min(1.0)
    };

    let components = Components {
        skills,
        keywords: keyword_overlap,
        title,
        experience,
    };
    let weighted = SKILLS_WEIGHT * skills
        + KEYWORDS_WEIGHT * keyword_overlap
        + TITLE_WEIGHT * title
        + EXPERIENCE_WEIGHT * experience;
    let ats_score = percent(weighted);

    let recommendations = recommend(&Signals {
        components,
        total_years,
        missing_skills,
        missing_keywords: missing_keywords.clone(),
        jd_title,
    });

    debug!(
        ats_score,
        skills, keyword_overlap, title, experience, total_years, "ATS score computed"
    );

    AtsReport {
        ats_score,
        keyword_matches: keyword_matches(technical, business),
        missing_keywords,
        recommendations,
        score_breakdown: ScoreBreakdown {
            skills: percent(skills),
            keywords: percent(keyword_overlap),
            title: percent(title),
            experience: percent(experience),
        },
    }
}

fn unscorable() -> AtsReport {
    AtsReport {
        ats_score: 0,
        keyword_matches: keyword_matches(Vec::new(), Vec::new()),
        missing_keywords: Vec::new(),
        recommendations: vec![EMPTY_JD_RECOMMENDATION.to_string()],
        score_breakdown: ScoreBreakdown::default(),
    }
}

fn keyword_matches(technical: Vec<String>, business: Vec<String>) -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("technical".to_string(), technical),
        ("business".to_string(), business),
    ])
}

fn percent(fraction: f32) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

// ────────────────────────────────────────────────────────────────────────────
// Job-description keywords
// ────────────────────────────────────────────────────────────────────────────

/// Walks the posting left to right. A vocabulary term starting at the current
/// token becomes a skill term and its tokens are consumed together; every
/// significant token is also a keyword. Both lists are deduplicated on
/// normalized form, first occurrence wins.
fn jd_terms(tokens: &[Token]) -> JdTerms {
    let mut terms = JdTerms::default();
    let mut seen_skills = HashSet::new();
    let mut seen_keywords = HashSet::new();
    let mut i = 0;

    while i < tokens.len() {
        let vocab = VOCABULARY.iter().find(|term| term.matches_at(tokens, i));
        let width = vocab.map_or(1, |term| term.tokens.len());
        let span = &tokens[i..i + width];

        if let Some(term) = vocab {
            if seen_skills.insert(term.tokens.join(" ")) {
                terms.skills.push(SkillTerm {
                    display: span.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "),
                    tokens: term.tokens.clone(),
                });
            }
        }
        for token in span.iter().filter(|t| is_significant(&t.norm)) {
            if seen_keywords.insert(token.norm.clone()) {
                terms.keywords.push(JdKeyword {
                    display: token.text.clone(),
                    norm: token.norm.clone(),
                    vocab: vocab.map(|term| term.kind),
                });
            }
        }
        i += width;
    }
    terms
}

/// Vocabulary kind when known; otherwise acronyms and tokens carrying
/// digits or symbols read as technical, plain words as business.
fn classify(keyword: &JdKeyword) -> TermKind {
    if let Some(kind) = keyword.vocab.or_else(|| vocabulary_kind(&keyword.norm)) {
        return kind;
    }
    let display = keyword.display.as_str();
    let is_acronym = display.len() >= 2 && display.chars().all(|c| c.is_ascii_uppercase());
    let has_symbol = display
        .chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '+' | '#' | '.' | '/'));
    if is_acronym || has_symbol {
        TermKind::Technical
    } else {
        TermKind::Business
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Title
// ────────────────────────────────────────────────────────────────────────────

static LABELLED_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\b(?:position|role|job title|title)\s*:\s*([^\n\r,.;:]+)").expect("valid regex")
});

static HIRING_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:hiring|seeking|looking for)\s+(?:an?\s+)?([a-z0-9+#/ -]+?)\s+(?:to|with|who|that|skilled|experienced|for|in)\b",
    )
    .expect("valid regex")
});

const COMMON_TITLES: &[&str] = &[
    "machine learning engineer",
    "software engineer",
    "data scientist",
    "data engineer",
    "data analyst",
    "product manager",
    "project manager",
    "business analyst",
    "devops engineer",
    "backend engineer",
    "frontend engineer",
    "full stack developer",
    "developer",
    "engineer",
    "analyst",
    "manager",
    "director",
];

/// The posting's stated title, lowercased: a `Title:` label, a "hiring a X to"
/// phrase, a short first line, or a common title mentioned anywhere.
fn extract_jd_title(jd: &str) -> Option<String> {
    let clean = |s: &str| {
        let s = s.trim().to_lowercase();
        (!s.is_empty()).then_some(s)
    };

    if let Some(title) = LABELLED_TITLE.captures(jd).and_then(|c| clean(&c[1])) {
        return Some(title);
    }
    if let Some(title) = HIRING_TITLE.captures(jd).and_then(|c| clean(&c[1])) {
        return Some(title);
    }
    if let Some(first) = jd.lines().map(str::trim).find(|l| !l.is_empty()) {
        let head = first.split(['—', '–', '|', '(']).next().unwrap_or(first);
        let words = head.split_whitespace().count();
        let listy = head.contains([':', ',', ';']) || head.trim_end().ends_with('.');
        if (1..=6).contains(&words) && !listy {
            if let Some(title) = clean(head) {
                return Some(title);
            }
        }
    }
    let lower = jd.to_lowercase();
    COMMON_TITLES
        .iter()
        .find(|t| lower.contains(*t))
        .map(|t| t.to_string())
}

/// Position of the entry with the latest start date; equal dates keep the
/// earlier entry, and an undated resume falls back to its first entry.
fn most_recent_position(experience: &[ExperienceEntry]) -> Option<&str> {
    let mut latest: Option<(NaiveDate, &ExperienceEntry)> = None;
    for entry in experience.iter().filter(|e| !e.position.is_empty()) {
        if let Some(start) = parse_resume_date(&entry.start_date) {
            if latest.map_or(true, |(best, _)| start > best) {
                latest = Some((start, entry));
            }
        }
    }
    latest
        .map(|(_, e)| e)
        .or_else(|| experience.iter().find(|e| !e.position.is_empty()))
        .map(|e| e.position.as_str())
}

/// 0.7 × share of title words covered + 0.3 × Jaro-Winkler on the full strings.
fn title_similarity(jd_title: &str, position: &str) -> f32 {
    let jd_words: HashSet<String> = norms(jd_title).into_iter().collect();
    if jd_words.is_empty() {
        return NEUTRAL_TITLE_SCORE;
    }
    let position_words: HashSet<String> = norms(position).into_iter().collect();
    let coverage = jd_words.intersection(&position_words).count() as f32 / jd_words.len() as f32;
    let fuzzy = jaro_winkler(&jd_title.to_lowercase(), &position.to_lowercase()) as f32;
    0.7 * coverage + 0.3 * fuzzy
}

// ────────────────────────────────────────────────────────────────────────────
// Experience length
// ────────────────────────────────────────────────────────────────────────────

/// Years covered by the union of all dated entries, plus a flat credit per
/// undated entry. Overlapping roles are not double counted.
fn total_years(experience: &[ExperienceEntry], as_of: NaiveDate) -> f32 {
    let mut intervals: Vec<(i32, i32)> = Vec::new();
    let mut undated = 0usize;

    for entry in experience {
        let start = parse_resume_date(&entry.start_date);
        let end = if entry.end_date.trim().is_empty() || is_present(&entry.end_date) {
            Some(as_of)
        } else {
            parse_resume_date(&entry.end_date)
        };
        match (start, end) {
            (Some(s), Some(e)) if s <= e => intervals.push((month_index(s), month_index(e))),
            (Some(_), Some(_)) => {}
            _ => undated += 1,
        }
    }

    intervals.sort_unstable();
    let mut months = 0;
    let mut current: Option<(i32, i32)> = None;
    for (s, e) in intervals {
        current = match current {
            Some((cs, ce)) if s <= ce => Some((cs, ce.max(e))),
            Some((cs, ce)) => {
                months += ce - cs;
                Some((s, e))
            }
            None => Some((s, e)),
        };
    }
    if let Some((cs, ce)) = current {
        months += ce - cs;
    }

    months as f32 / 12.0 + undated as f32 * UNDATED_ENTRY_YEARS
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

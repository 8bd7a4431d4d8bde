//! Per-field merge of a rewrite proposal into a canonical resume.
//!
//! Canonical wins on structure. The proposal may only touch four fields, and
//! each one is reduced independently: a rejected summary never blocks accepted
//! bullets, and a bad reference only discards itself.

use std::ops::Deref;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::canonical::tokens::count_quantified;
use crate::canonical::validator::sanitize_text;
use crate::canonical::CanonicalResume;
use crate::models::proposal::{ExperienceRewrite, RewriteProposal};
use crate::models::resume::{ExperienceEntry, ProjectEntry, ResumeRecord, SkillGroups};

/// Most projects a resume shows.
pub const MAX_RANKED_PROJECTS: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Report types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevertReason {
    /// The rewrite carries fewer numbers, percentages or amounts than the original.
    QuantifiedLoss { before: usize, after: usize },
    EmptyRewrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Unchanged,
    Replaced,
    Reverted { reason: RevertReason },
}

/// A proposal reference to something the canonical resume does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnknownReference {
    #[error("no experience entry for company '{company}'")]
    Experience { company: String },

    #[error("no skill category '{category}'")]
    SkillCategory { category: String },

    #[error("no skill '{item}' in category '{category}'")]
    SkillItem { category: String, item: String },

    #[error("no project titled '{title}'")]
    Project { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub summary: FieldOutcome,
    /// One outcome per canonical experience entry, in canonical order.
    pub experience: Vec<FieldOutcome>,
    pub skills: FieldOutcome,
    pub projects: FieldOutcome,
    pub discarded: Vec<UnknownReference>,
}

impl MergeReport {
    fn unchanged(experience_len: usize) -> Self {
        MergeReport {
            summary: FieldOutcome::Unchanged,
            experience: vec![FieldOutcome::Unchanged; experience_len],
            skills: FieldOutcome::Unchanged,
            projects: FieldOutcome::Unchanged,
            discarded: Vec::new(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Merged resume
// ────────────────────────────────────────────────────────────────────────────

/// Canonical record with the accepted parts of a proposal applied.
///
/// Every project stays in `record`; `ranked_projects` holds the indices of the
/// (at most three) projects to show, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedResume {
    #[serde(rename = "resume")]
    record: ResumeRecord,
    ranked_projects: Vec<usize>,
    #[serde(rename = "merge_report")]
    report: MergeReport,
}

impl MergedResume {
    /// The canonical record with nothing overridden.
    pub fn unmodified(canonical: &CanonicalResume) -> Self {
        MergedResume {
            record: canonical.record().clone(),
            ranked_projects: default_ranking(&canonical.projects),
            report: MergeReport::unchanged(canonical.experience.len()),
        }
    }

    pub fn record(&self) -> &ResumeRecord {
        &self.record
    }

    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    pub fn project_ranking(&self) -> &[usize] {
        &self.ranked_projects
    }
}

impl Deref for MergedResume {
    type Target = ResumeRecord;

    fn deref(&self) -> &ResumeRecord {
        &self.record
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Merge
// ────────────────────────────────────────────────────────────────────────────

/// Applies `proposal` to `canonical`. Never fails: anything unsafe or unknown
/// falls back to canonical content and is recorded in the report.
pub fn merge(canonical: &CanonicalResume, proposal: Option<&RewriteProposal>) -> MergedResume {
    let Some(proposal) = proposal.filter(|p| !p.is_empty()) else {
        return MergedResume::unmodified(canonical);
    };

    let mut record = canonical.record().clone();
    let mut discarded = Vec::new();

    let (summary, summary_outcome) =
        merge_summary(&record.summary, proposal.rewritten_summary.as_deref());
    record.summary = summary;

    let experience_outcomes = merge_experience(
        &mut record.experience,
        &proposal.rewritten_experience,
        &mut discarded,
    );

    let skills_outcome = merge_skills(&mut record.skills, &proposal.ranked_skills, &mut discarded);

    let (ranked_projects, projects_outcome) =
        select_projects(&record.projects, &proposal.ranked_projects, &mut discarded);

    for reference in &discarded {
        warn!(reference = %reference, "Discarding unknown proposal reference");
    }

    let report = MergeReport {
        summary: summary_outcome,
        experience: experience_outcomes,
        skills: skills_outcome,
        projects: projects_outcome,
        discarded,
    };
    debug!(
        replaced_entries = report
            .experience
            .iter()
            .filter(|o| **o == FieldOutcome::Replaced)
            .count(),
        discarded = report.discarded.len(),
        "Proposal merged"
    );

    MergedResume {
        record,
        ranked_projects,
        report,
    }
}

/// Summary reducer: a non-empty rewrite that keeps every quantified token count.
pub fn merge_summary(canonical: &str, proposed: Option<&str>) -> (String, FieldOutcome) {
    let Some(proposed) = proposed else {
        return (canonical.to_string(), FieldOutcome::Unchanged);
    };
    let proposed = sanitize_text(proposed);

    if proposed.is_empty() {
        warn!("Reverting empty summary rewrite");
        return (
            canonical.to_string(),
            FieldOutcome::Reverted {
                reason: RevertReason::EmptyRewrite,
            },
        );
    }
    if proposed == canonical {
        return (proposed, FieldOutcome::Unchanged);
    }

    let before = count_quantified([canonical]);
    let after = count_quantified([proposed.as_str()]);
    if after < before {
        warn!(before, after, "Reverting summary rewrite that drops quantified tokens");
        return (
            canonical.to_string(),
            FieldOutcome::Reverted {
                reason: RevertReason::QuantifiedLoss { before, after },
            },
        );
    }

    (proposed, FieldOutcome::Replaced)
}

/// Experience reducer. The k-th rewrite naming a company applies to the k-th
/// entry at that company; each entry is checked on its own.
pub fn merge_experience(
    entries: &mut [ExperienceEntry],
    rewrites: &[ExperienceRewrite],
    discarded: &mut Vec<UnknownReference>,
) -> Vec<FieldOutcome> {
    let mut outcomes = vec![FieldOutcome::Unchanged; entries.len()];
    let mut taken = vec![false; entries.len()];

    for rewrite in rewrites {
        let wanted = fold_name(&rewrite.company);
        let Some(idx) = entries
            .iter()
            .enumerate()
            .position(|(i, e)| !taken[i] && fold_name(&e.company) == wanted)
        else {
            discarded.push(UnknownReference::Experience {
                company: rewrite.company.clone(),
            });
            continue;
        };
        taken[idx] = true;

        let entry = &mut entries[idx];
        let bullets: Vec<String> = rewrite
            .bullets
            .iter()
            .map(|b| sanitize_text(b))
            .filter(|b| !b.is_empty())
            .collect();

        if bullets.is_empty() {
            warn!(company = %entry.company, "Reverting empty bullet rewrite");
            outcomes[idx] = FieldOutcome::Reverted {
                reason: RevertReason::EmptyRewrite,
            };
            continue;
        }

        let before = count_quantified(entry.achievements.iter().map(String::as_str));
        let after = count_quantified(bullets.iter().map(String::as_str));
        if after < before {
            warn!(
                company = %entry.company,
                before,
                after,
                "Reverting bullet rewrite that drops quantified tokens"
            );
            outcomes[idx] = FieldOutcome::Reverted {
                reason: RevertReason::QuantifiedLoss { before, after },
            };
            continue;
        }

        if bullets != entry.achievements {
            entry.achievements = bullets;
            outcomes[idx] = FieldOutcome::Replaced;
        }
    }

    outcomes
}

/// Skills reducer: reorders items inside existing categories. Proposed items
/// come first, the rest keep their canonical order. Category order, names and
/// item spelling never change.
pub fn merge_skills(
    skills: &mut SkillGroups,
    ranked: &SkillGroups,
    discarded: &mut Vec<UnknownReference>,
) -> FieldOutcome {
    let mut changed = false;

    for proposed in ranked.iter() {
        let Some(pos) = skills.position(&proposed.name) else {
            discarded.push(UnknownReference::SkillCategory {
                category: proposed.name.clone(),
            });
            continue;
        };
        let category = &mut skills.0[pos];

        let mut used = vec![false; category.items.len()];
        let mut order = Vec::with_capacity(category.items.len());
        for item in &proposed.items {
            let wanted = fold_name(item);
            match category
                .items
                .iter()
                .position(|existing| fold_name(existing) == wanted)
            {
                Some(i) if !used[i] => {
                    used[i] = true;
                    order.push(i);
                }
                Some(_) => {}
                None => discarded.push(UnknownReference::SkillItem {
                    category: category.name.clone(),
                    item: item.clone(),
                }),
            }
        }
        order.extend((0..category.items.len()).filter(|i| !used[*i]));

        if order.iter().enumerate().any(|(pos, &i)| pos != i) {
            category.items = order.iter().map(|&i| category.items[i].clone()).collect();
            changed = true;
        }
    }

    if changed {
        FieldOutcome::Replaced
    } else {
        FieldOutcome::Unchanged
    }
}

/// Project reducer: up to three existing projects, in proposed order. Falls
/// back to the first three canonical projects when no title is valid.
pub fn select_projects(
    projects: &[ProjectEntry],
    ranked_titles: &[String],
    discarded: &mut Vec<UnknownReference>,
) -> (Vec<usize>, FieldOutcome) {
    let mut selection: Vec<usize> = Vec::new();

    for title in ranked_titles {
        let wanted = fold_name(title);
        match projects.iter().position(|p| fold_name(&p.title) == wanted) {
            Some(idx) => {
                if selection.len() < MAX_RANKED_PROJECTS && !selection.contains(&idx) {
                    selection.push(idx);
                }
            }
            None => discarded.push(UnknownReference::Project {
                title: title.clone(),
            }),
        }
    }

    let default = default_ranking(projects);
    if selection.is_empty() || selection == default {
        (default, FieldOutcome::Unchanged)
    } else {
        (selection, FieldOutcome::Replaced)
    }
}

fn default_ranking(projects: &[ProjectEntry]) -> Vec<usize> {
    (0..projects.len().min(MAX_RANKED_PROJECTS)).collect()
}

fn fold_name(name: &str) -> String {
    sanitize_text(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::validate;
    use crate::models::proposal::ExperienceRewrite;
    use crate::models::resume::{SkillCategory, StructuredGuess};

    fn entry(company: &str, start: &str, bullets: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            company: company.to_string(),
            position: "Engineer".to_string(),
            start_date: start.to_string(),
            achievements: bullets.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    fn project(title: &str) -> ProjectEntry {
        ProjectEntry {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn canonical() -> CanonicalResume {
        let mut guess = StructuredGuess {
            summary: "Engineer with 6 years building data platforms".to_string(),
            experience: vec![
                entry("Acme", "2020-01", &["Cut costs by 40%", "Led 3 engineers"]),
                entry("Globex", "2017-01", &["Built ETL jobs", "Wrote docs"]),
                entry("Acme", "2015-01", &["Migrated 12 services"]),
            ],
            projects: vec![project("ETL"), project("Dashboard"), project("CLI"), project("Bot")],
            certifications: vec!["AWS SA".to_string()],
            languages: vec!["English".to_string()],
            ..Default::default()
        };
        guess.skills = SkillGroups(vec![
            SkillCategory {
                name: "Programming".to_string(),
                items: vec!["Python".to_string(), "SQL".to_string(), "Rust".to_string()],
            },
            SkillCategory {
                name: "Analytics".to_string(),
                items: vec!["Tableau".to_string()],
            },
        ]);
        guess
            .links
            .insert("GitHub".to_string(), "https://github.com/jdoe".to_string());
        validate("", guess).unwrap()
    }

    fn rewrite(company: &str, bullets: &[&str]) -> ExperienceRewrite {
        ExperienceRewrite {
            company: company.to_string(),
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_proposal_equals_canonical() {
        let canonical = canonical();
        let merged = merge(&canonical, None);
        assert_eq!(merged.record(), canonical.record());
        assert_eq!(merged.project_ranking(), &[0, 1, 2]);

        let empty = RewriteProposal {
            rewritten_summary: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(merge(&canonical, Some(&empty)).record(), canonical.record());
    }

    #[test]
    fn test_structure_is_preserved_whatever_the_proposal() {
        let canonical = canonical();
        let proposal = RewriteProposal {
            rewritten_summary: Some("Platform engineer with 6 years of impact".to_string()),
            rewritten_experience: vec![
                rewrite("Acme", &["Reduced spend 40%", "Managed 3 engineers", "Extra bullet"]),
                rewrite("Initech", &["Invented 99 things"]),
            ],
            ranked_skills: SkillGroups(vec![SkillCategory {
                name: "Cooking".to_string(),
                items: vec!["Soup".to_string()],
            }]),
            ranked_projects: vec!["Moonshot".to_string(), "CLI".to_string()],
        };
        let merged = merge(&canonical, Some(&proposal));
        assert_eq!(merged.structure_counts(), canonical.structure_counts());
        assert_eq!(merged.links, canonical.links);
        assert_eq!(merged.certifications, canonical.certifications);
        assert_eq!(merged.languages, canonical.languages);
        for (m, c) in merged.experience.iter().zip(canonical.experience.iter()) {
            assert_eq!(m.company, c.company);
            assert_eq!(m.start_date, c.start_date);
        }
    }

    #[test]
    fn test_quantified_loss_reverts_only_that_entry() {
        let canonical = canonical();
        let proposal = RewriteProposal {
            rewritten_summary: Some("Seasoned data platform engineer with 6 years".to_string()),
            rewritten_experience: vec![
                rewrite("Acme", &["Cut costs significantly", "Led engineers"]),
                rewrite("Globex", &["Built 20 ETL jobs in Airflow", "Documented pipelines"]),
            ],
            ..Default::default()
        };
        let merged = merge(&canonical, Some(&proposal));

        assert_eq!(merged.experience[0].achievements, canonical.experience[0].achievements);
        assert_eq!(
            merged.report().experience[0],
            FieldOutcome::Reverted {
                reason: RevertReason::QuantifiedLoss { before: 2, after: 0 }
            }
        );
        assert_eq!(
            merged.experience[1].achievements,
            vec!["Built 20 ETL jobs in Airflow", "Documented pipelines"]
        );
        assert_eq!(merged.report().experience[1], FieldOutcome::Replaced);
        assert_eq!(merged.report().summary, FieldOutcome::Replaced);
        assert_eq!(merged.summary, "Seasoned data platform engineer with 6 years");
    }

    #[test]
    fn test_summary_losing_numbers_is_reverted() {
        let (summary, outcome) = merge_summary(
            "Engineer with 6 years building data platforms",
            Some("Experienced engineer"),
        );
        assert_eq!(summary, "Engineer with 6 years building data platforms");
        assert_eq!(
            outcome,
            FieldOutcome::Reverted {
                reason: RevertReason::QuantifiedLoss { before: 1, after: 0 }
            }
        );
    }

    #[test]
    fn test_repeated_company_maps_in_order() {
        let canonical = canonical();
        let proposal = RewriteProposal {
            rewritten_experience: vec![
                rewrite("acme ", &["Cut cloud costs by 40%", "Mentored 3 engineers"]),
                rewrite("ACME", &["Migrated 12 services to Kubernetes"]),
                rewrite("Acme", &["A third Acme role that does not exist"]),
            ],
            ..Default::default()
        };
        let merged = merge(&canonical, Some(&proposal));
        assert_eq!(
            merged.experience[0].achievements,
            vec!["Cut cloud costs by 40%", "Mentored 3 engineers"]
        );
        assert_eq!(
            merged.experience[2].achievements,
            vec!["Migrated 12 services to Kubernetes"]
        );
        assert_eq!(merged.report().experience[1], FieldOutcome::Unchanged);
        assert_eq!(
            merged.report().discarded,
            vec![UnknownReference::Experience {
                company: "Acme".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_bullet_rewrite_is_reverted() {
        let canonical = canonical();
        let proposal = RewriteProposal {
            rewritten_experience: vec![rewrite("Globex", &[" ", ""])],
            ..Default::default()
        };
        let merged = merge(&canonical, Some(&proposal));
        assert_eq!(merged.experience[1].achievements, canonical.experience[1].achievements);
        assert_eq!(
            merged.report().experience[1],
            FieldOutcome::Reverted {
                reason: RevertReason::EmptyRewrite
            }
        );
    }

    #[test]
    fn test_skills_reorder_within_category() {
        let canonical = canonical();
        let proposal = RewriteProposal {
            ranked_skills: SkillGroups(vec![
                SkillCategory {
                    name: "programming".to_string(),
                    items: vec!["rust".to_string(), "Go".to_string(), "RUST".to_string()],
                },
                SkillCategory {
                    name: "Cooking".to_string(),
                    items: vec![],
                },
            ]),
            ..Default::default()
        };
        let merged = merge(&canonical, Some(&proposal));
        assert_eq!(merged.skills.0[0].items, vec!["Rust", "Python", "SQL"]);
        assert_eq!(merged.skills.0[1].items, vec!["Tableau"]);
        assert_eq!(merged.report().skills, FieldOutcome::Replaced);
        assert_eq!(
            merged.report().discarded,
            vec![
                UnknownReference::SkillItem {
                    category: "Programming".to_string(),
                    item: "Go".to_string()
                },
                UnknownReference::SkillCategory {
                    category: "Cooking".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_project_is_discarded_not_fatal() {
        let canonical = canonical();
        let proposal = RewriteProposal {
            ranked_projects: vec!["Bot".to_string(), "Ghost".to_string(), "etl".to_string()],
            ..Default::default()
        };
        let merged = merge(&canonical, Some(&proposal));
        assert_eq!(merged.project_ranking(), &[3, 0]);
        let titles: Vec<&str> = merged
            .project_ranking()
            .iter()
            .map(|&idx| merged.projects[idx].title.as_str())
            .collect();
        assert_eq!(titles, vec!["Bot", "ETL"]);
        assert_eq!(merged.projects.len(), 4);
        assert_eq!(
            merged.report().discarded,
            vec![UnknownReference::Project {
                title: "Ghost".to_string()
            }]
        );
    }

    #[test]
    fn test_project_selection_is_capped_at_three() {
        let projects: Vec<ProjectEntry> = ["A", "B", "C", "D"].iter().map(|t| project(t)).collect();
        let titles: Vec<String> = ["D", "C", "B", "A"].iter().map(|t| t.to_string()).collect();
        let mut discarded = Vec::new();
        let (selection, outcome) = select_projects(&projects, &titles, &mut discarded);
        assert_eq!(selection, vec![3, 2, 1]);
        assert_eq!(outcome, FieldOutcome::Replaced);
        assert!(discarded.is_empty());
    }

    #[test]
    fn test_merged_serializes_report() {
        let merged = merge(&canonical(), None);
        let value = serde_json::to_value(&merged).unwrap();
        assert_eq!(value["merge_report"]["summary"]["status"], "unchanged");
        assert_eq!(value["ranked_projects"], serde_json::json!([0, 1, 2]));
        assert!(value["resume"]["skills"].is_object());
    }
}

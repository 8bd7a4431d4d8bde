//! Block emission: MergedResume + TemplateConfig -> ordered, unmeasured blocks.

use serde::Serialize;

use crate::layout::template::TemplateConfig;
use crate::merge::MergedResume;
use crate::models::resume::{EducationEntry, ExperienceEntry, ProjectEntry, SectionKey};

const SEPARATOR: &str = " | ";
const CONTACT_SEPARATOR: &str = " • ";

// ────────────────────────────────────────────────────────────────────────────
// Block types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleTag {
    Name,
    Contact,
    SectionTitle,
    EntryHeader,
    Bullet,
    Body,
}

impl StyleTag {
    /// Font size relative to the template's body size.
    pub fn size_factor(&self) -> f32 {
        match self {
            StyleTag::Name => 16.0 / 11.0,
            _ => 1.0,
        }
    }

    /// Left indent in points.
    pub fn indent_pt(&self) -> f32 {
        match self {
            StyleTag::Bullet => 18.0,
            _ => 0.0,
        }
    }

    /// Paragraph spacing after the block, in points.
    pub fn space_after_pt(&self) -> f32 {
        match self {
            StyleTag::Name => 4.0,
            StyleTag::Contact => 6.0,
            StyleTag::SectionTitle | StyleTag::EntryHeader | StyleTag::Body => 2.0,
            StyleTag::Bullet => 1.0,
        }
    }
}

/// Where a block came from: its section, and for entry sections the entry
/// index (canonical order) and item index within the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockOwner {
    pub section: SectionKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
}

impl BlockOwner {
    fn section(section: SectionKey) -> Self {
        BlockOwner {
            section,
            entry: None,
            item: None,
        }
    }

    fn entry(section: SectionKey, entry: usize) -> Self {
        BlockOwner {
            section,
            entry: Some(entry),
            item: None,
        }
    }

    fn item(section: SectionKey, entry: usize, item: usize) -> Self {
        BlockOwner {
            section,
            entry: Some(entry),
            item: Some(item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutBlock {
    pub text: String,
    pub style: StyleTag,
    /// Estimated height in points. Zero until measured.
    pub height: f32,
    pub owner: BlockOwner,
}

impl LayoutBlock {
    fn new(text: impl Into<String>, style: StyleTag, owner: BlockOwner) -> Self {
        LayoutBlock {
            text: text.into(),
            style,
            height: 0.0,
            owner,
        }
    }

    /// Only experience bullets may be trimmed to fit the page.
    pub fn is_trimmable(&self) -> bool {
        self.style == StyleTag::Bullet && self.owner.section == SectionKey::Experience
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Emission
// ────────────────────────────────────────────────────────────────────────────

/// Emits every section in template order. Empty sections are skipped, except
/// `languages`, whose title is always present.
pub fn emit_blocks(resume: &MergedResume, template: &TemplateConfig) -> Vec<LayoutBlock> {
    let mut blocks = Vec::new();
    for &key in &template.section_order {
        let body = section_body(resume, key);
        if body.is_empty() && key != SectionKey::Languages {
            continue;
        }
        if has_title(key) {
            blocks.push(LayoutBlock::new(
                template.title_for(key),
                StyleTag::SectionTitle,
                BlockOwner::section(key),
            ));
        }
        blocks.extend(body);
    }
    blocks
}

/// Contact and link lines sit in the page header without a section title.
fn has_title(key: SectionKey) -> bool {
    !matches!(key, SectionKey::ContactInfo | SectionKey::Links)
}

fn section_body(resume: &MergedResume, key: SectionKey) -> Vec<LayoutBlock> {
    let owner = BlockOwner::section(key);
    match key {
        SectionKey::ContactInfo => {
            let ci = &resume.contact_info;
            let mut blocks = Vec::new();
            if !ci.full_name.is_empty() {
                blocks.push(LayoutBlock::new(&ci.full_name, StyleTag::Name, owner));
            }
            let line = join_present(
                [ci.location.as_str(), ci.email.as_str(), ci.phone.as_str()],
                CONTACT_SEPARATOR,
            );
            if !line.is_empty() {
                blocks.push(LayoutBlock::new(line, StyleTag::Contact, owner));
            }
            blocks
        }
        SectionKey::Links => {
            let line = resume
                .links
                .iter()
                .map(|(label, url)| format!("{label}: {url}"))
                .collect::<Vec<_>>()
                .join(CONTACT_SEPARATOR);
            if line.is_empty() {
                Vec::new()
            } else {
                vec![LayoutBlock::new(line, StyleTag::Contact, owner)]
            }
        }
        SectionKey::Summary => {
            if resume.summary.is_empty() {
                Vec::new()
            } else {
                vec![LayoutBlock::new(&resume.summary, StyleTag::Body, owner)]
            }
        }
        SectionKey::Education => resume
            .education
            .iter()
            .enumerate()
            .map(|(i, edu)| {
                LayoutBlock::new(
                    education_line(edu),
                    StyleTag::EntryHeader,
                    BlockOwner::entry(key, i),
                )
            })
            .filter(|b| !b.text.is_empty())
            .collect(),
        SectionKey::Experience => {
            let mut blocks = Vec::new();
            for (i, exp) in resume.experience.iter().enumerate() {
                blocks.push(LayoutBlock::new(
                    experience_header(exp),
                    StyleTag::EntryHeader,
                    BlockOwner::entry(key, i),
                ));
                for (j, bullet) in exp.achievements.iter().enumerate() {
                    blocks.push(LayoutBlock::new(
                        bullet,
                        StyleTag::Bullet,
                        BlockOwner::item(key, i, j),
                    ));
                }
            }
            blocks
        }
        SectionKey::Projects => {
            let mut blocks = Vec::new();
            for &idx in resume.project_ranking() {
                let Some(project) = resume.projects.get(idx) else {
                    continue;
                };
                blocks.push(LayoutBlock::new(
                    project_header(project),
                    StyleTag::EntryHeader,
                    BlockOwner::entry(key, idx),
                ));
                if !project.description.is_empty() {
                    blocks.push(LayoutBlock::new(
                        &project.description,
                        StyleTag::Body,
                        BlockOwner::entry(key, idx),
                    ));
                }
                for (j, bullet) in project.bullets.iter().enumerate() {
                    blocks.push(LayoutBlock::new(
                        bullet,
                        StyleTag::Bullet,
                        BlockOwner::item(key, idx, j),
                    ));
                }
            }
            blocks
        }
        SectionKey::Skills => resume
            .skills
            .iter()
            .enumerate()
            .filter(|(_, category)| !category.items.is_empty())
            .map(|(i, category)| {
                LayoutBlock::new(
                    format!("{}: {}", category.name, category.items.join(", ")),
                    StyleTag::Body,
                    BlockOwner::entry(key, i),
                )
            })
            .collect(),
        SectionKey::Certifications => resume
            .certifications
            .iter()
            .enumerate()
            .map(|(i, cert)| LayoutBlock::new(cert, StyleTag::Bullet, BlockOwner::entry(key, i)))
            .collect(),
        SectionKey::Languages => {
            if resume.languages.is_empty() {
                Vec::new()
            } else {
                vec![LayoutBlock::new(
                    resume.languages.join(", "),
                    StyleTag::Body,
                    owner,
                )]
            }
        }
    }
}

fn join_present<'a>(parts: impl IntoIterator<Item = &'a str>, separator: &str) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Company, role, dates, location. Absent fields are left out.
fn experience_header(exp: &ExperienceEntry) -> String {
    let dates = join_present([exp.start_date.as_str(), exp.end_date.as_str()], " – ");
    join_present(
        [
            exp.company.as_str(),
            exp.position.as_str(),
            dates.as_str(),
            exp.location.as_str(),
        ],
        SEPARATOR,
    )
}

fn education_line(edu: &EducationEntry) -> String {
    let gpa = if edu.gpa.is_empty() {
        String::new()
    } else {
        format!("GPA: {}", edu.gpa)
    };
    join_present(
        [
            edu.institution.as_str(),
            edu.degree.as_str(),
            edu.field.as_str(),
            edu.location.as_str(),
            edu.graduation_date.as_str(),
            gpa.as_str(),
        ],
        SEPARATOR,
    )
}

fn project_header(project: &ProjectEntry) -> String {
    if project.technologies.is_empty() {
        project.title.clone()
    } else {
        format!("{} — {}", project.title, project.technologies.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::validate;
    use crate::merge::merge;
    use crate::models::proposal::RewriteProposal;
    use crate::models::resume::{ContactInfo, SkillCategory, SkillGroups, StructuredGuess};

    fn guess() -> StructuredGuess {
        let mut guess = StructuredGuess {
            contact_info: ContactInfo {
                full_name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                ..Default::default()
            },
            summary: "Data engineer".to_string(),
            education: vec![EducationEntry {
                institution: "MIT".to_string(),
                degree: "BSc".to_string(),
                graduation_date: "2014".to_string(),
                ..Default::default()
            }],
            experience: vec![ExperienceEntry {
                company: "Acme".to_string(),
                position: "Engineer".to_string(),
                start_date: "2019-06".to_string(),
                end_date: "Present".to_string(),
                achievements: vec!["Shipped things".to_string(), "Fixed things".to_string()],
                ..Default::default()
            }],
            projects: ["ETL", "Dashboard", "CLI", "Bot"]
                .iter()
                .map(|t| ProjectEntry {
                    title: t.to_string(),
                    technologies: vec!["Rust".to_string()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        guess.skills = SkillGroups(vec![
            SkillCategory {
                name: "Programming".to_string(),
                items: vec!["Python".to_string(), "SQL".to_string()],
            },
            SkillCategory {
                name: "Empty".to_string(),
                items: vec![],
            },
        ]);
        guess
            .links
            .insert("GitHub".to_string(), "github.com/jane".to_string());
        guess
    }

    fn blocks_for(guess: StructuredGuess, proposal: Option<&RewriteProposal>) -> Vec<LayoutBlock> {
        let canonical = validate("", guess).unwrap();
        emit_blocks(&merge(&canonical, proposal), &TemplateConfig::harvard())
    }

    fn texts(blocks: &[LayoutBlock], style: StyleTag) -> Vec<&str> {
        blocks
            .iter()
            .filter(|b| b.style == style)
            .map(|b| b.text.as_str())
            .collect()
    }

    #[test]
    fn test_sections_follow_template_order() {
        let blocks = blocks_for(guess(), None);
        assert_eq!(
            texts(&blocks, StyleTag::SectionTitle),
            vec!["SUMMARY", "EDUCATION", "EXPERIENCE", "PROJECTS", "SKILLS", "LANGUAGES"]
        );
        assert_eq!(blocks[0].style, StyleTag::Name);
        assert_eq!(
            texts(&blocks, StyleTag::Contact),
            vec!["jane@example.com", "GitHub: github.com/jane"]
        );
    }

    #[test]
    fn test_languages_title_is_always_emitted() {
        let blocks = blocks_for(guess(), None);
        let last = blocks.last().unwrap();
        assert_eq!(last.text, "LANGUAGES");
        assert_eq!(last.owner.section, SectionKey::Languages);
    }

    #[test]
    fn test_entry_lines_omit_absent_fields() {
        let blocks = blocks_for(guess(), None);
        let headers = texts(&blocks, StyleTag::EntryHeader);
        assert_eq!(headers[0], "MIT | BSc | 2014");
        assert_eq!(headers[1], "Acme | Engineer | 2019-06 – Present");
        assert!(texts(&blocks, StyleTag::Body).contains(&"Programming: Python, SQL"));
    }

    #[test]
    fn test_projects_render_in_ranked_order_capped_at_three() {
        let proposal = RewriteProposal {
            ranked_projects: vec!["Bot".to_string(), "ETL".to_string()],
            ..Default::default()
        };
        let blocks = blocks_for(guess(), Some(&proposal));
        let projects: Vec<&str> = blocks
            .iter()
            .filter(|b| b.owner.section == SectionKey::Projects && b.style == StyleTag::EntryHeader)
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(projects, vec!["Bot — Rust", "ETL — Rust"]);

        let default = blocks_for(guess(), None);
        let count = default
            .iter()
            .filter(|b| b.owner.section == SectionKey::Projects && b.style == StyleTag::EntryHeader)
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_custom_title_and_trimmable_flags() {
        let canonical = validate("", guess()).unwrap();
        let mut template = TemplateConfig::harvard();
        template
            .section_titles
            .insert(SectionKey::Experience, "Work History".to_string());
        let blocks = emit_blocks(&merge(&canonical, None), &template);
        assert!(texts(&blocks, StyleTag::SectionTitle).contains(&"Work History"));

        let trimmable: Vec<&str> = blocks
            .iter()
            .filter(|b| b.is_trimmable())
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(trimmable, vec!["Shipped things", "Fixed things"]);
    }
}

use serde::{Deserialize, Serialize};

use crate::models::resume::SkillGroups;

/// Rewritten bullets for one existing experience entry, addressed by company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRewrite {
    pub company: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// Partial, LLM-sourced rewrite of a canonical resume.
///
/// Every field is optional; an absent field means "no change". The proposal can
/// only rephrase or reorder what already exists, never introduce entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteProposal {
    pub rewritten_summary: Option<String>,
    pub rewritten_experience: Vec<ExperienceRewrite>,
    pub ranked_skills: SkillGroups,
    /// Project titles, best first. Only the first three valid titles are used.
    pub ranked_projects: Vec<String>,
}

impl RewriteProposal {
    pub fn is_empty(&self) -> bool {
        self.rewritten_summary
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
            && self.rewritten_experience.is_empty()
            && self.ranked_skills.is_empty()
            && self.ranked_projects.is_empty()
    }
}

//! Lenient decoding of rewrite proposals.
//!
//! The proposal comes from an LLM, so only a structurally hopeless payload is a
//! `SchemaViolation`. A field with the wrong shape is dropped on its own and the
//! rest of the proposal is still used.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::proposal::{ExperienceRewrite, RewriteProposal};
use crate::models::resume::{SkillCategory, SkillGroups};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProposalError {
    #[error("rewrite proposal violates the schema: {reason}")]
    SchemaViolation { reason: String },
}

impl ProposalError {
    fn schema(reason: impl Into<String>) -> Self {
        ProposalError::SchemaViolation {
            reason: reason.into(),
        }
    }
}

/// Parses raw LLM output, tolerating ```json fences and prose around the object.
pub fn parse_proposal_text(text: &str) -> Result<RewriteProposal, ProposalError> {
    let body = strip_json_fences(text);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(first_err) => {
            let embedded = outermost_object(body)
                .ok_or_else(|| ProposalError::schema(format!("not JSON: {first_err}")))?;
            serde_json::from_str(embedded)
                .map_err(|e| ProposalError::schema(format!("not JSON: {e}")))?
        }
    };
    parse_proposal_value(value)
}

/// Decodes a proposal object field by field. Unknown fields are ignored.
pub fn parse_proposal_value(value: Value) -> Result<RewriteProposal, ProposalError> {
    let Value::Object(mut fields) = value else {
        return Err(ProposalError::schema(format!(
            "expected an object, got {}",
            json_kind(&value)
        )));
    };

    Ok(RewriteProposal {
        rewritten_summary: take_summary(&mut fields),
        rewritten_experience: take_experience(&mut fields),
        ranked_skills: take_skills(&mut fields),
        ranked_projects: take_projects(&mut fields),
    })
}

fn take_summary(fields: &mut Map<String, Value>) -> Option<String> {
    match fields.remove("rewritten_summary") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            warn!(kind = json_kind(&other), "Dropping malformed rewritten_summary");
            None
        }
    }
}

fn take_experience(fields: &mut Map<String, Value>) -> Vec<ExperienceRewrite> {
    let items = match fields.remove("rewritten_experience") {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(kind = json_kind(&other), "Dropping malformed rewritten_experience");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<ExperienceRewrite>(item) {
            Ok(rewrite) => Some(rewrite),
            Err(e) => {
                warn!(index = idx, error = %e, "Dropping malformed experience rewrite");
                None
            }
        })
        .collect()
}

fn take_skills(fields: &mut Map<String, Value>) -> SkillGroups {
    let categories = match fields.remove("ranked_skills") {
        None | Some(Value::Null) => return SkillGroups::default(),
        Some(Value::Object(categories)) => categories,
        Some(other) => {
            warn!(kind = json_kind(&other), "Dropping malformed ranked_skills");
            return SkillGroups::default();
        }
    };

    let groups = categories
        .into_iter()
        .filter_map(|(name, items)| match items {
            Value::Array(items) => Some(SkillCategory {
                name,
                items: strings_only(items),
            }),
            other => {
                warn!(category = %name, kind = json_kind(&other), "Dropping malformed skill ranking");
                None
            }
        })
        .collect();
    SkillGroups(groups)
}

fn take_projects(fields: &mut Map<String, Value>) -> Vec<String> {
    match fields.remove("ranked_projects") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => strings_only(items),
        Some(other) => {
            warn!(kind = json_kind(&other), "Dropping malformed ranked_projects");
            Vec::new()
        }
    }
}

fn strings_only(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let inner = inner.trim_start();
    inner
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(inner)
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

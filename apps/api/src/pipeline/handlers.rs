//! Axum route handlers for the Resume API.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ats::AtsReport;
use crate::canonical::CanonicalResume;
use crate::errors::AppError;
use crate::layout::TemplateConfig;
use crate::models::resume::{StructureCounts, StructuredGuess};
use crate::pipeline::TailorOutcome;
use crate::pipeline::source::{InlineProposal, RawProposal};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub structured: StructuredGuess,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub resume: CanonicalResume,
    pub counts: StructureCounts,
}

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub structured: StructuredGuess,
    pub job_description: String,
    /// Rewrite proposal as a JSON object, or as model output text.
    #[serde(default)]
    pub proposal: Option<Value>,
}

impl TailorRequest {
    fn source(&mut self) -> InlineProposal {
        InlineProposal(self.proposal.take().map(|value| match value {
            Value::String(text) => RawProposal::Text(text),
            other => RawProposal::Json(other),
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub template: TemplateConfig,
    pub page_budget_pt: f32,
    pub text_width_pt: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/template
pub async fn handle_get_template(State(state): State<AppState>) -> Json<TemplateResponse> {
    let template = state.template.as_ref().clone();
    Json(TemplateResponse {
        page_budget_pt: template.page_budget(),
        text_width_pt: template.text_width_pt(),
        template,
    })
}

/// POST /api/v1/resumes/validate
///
/// Raw text + structured guess → canonical record. 422 on data loss.
pub async fn handle_validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    let resume = state
        .coordinator
        .validate(request.raw_text, request.structured)
        .await?;
    let counts = resume.structure_counts();
    Ok(Json(ValidateResponse { resume, counts }))
}

/// POST /api/v1/resumes/ats
///
/// Runs the full pipeline and returns only the ATS report.
pub async fn handle_ats(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<AtsReport>, AppError> {
    let outcome = run_tailor(&state, request).await?;
    Ok(Json(outcome.ats.clone()))
}

/// POST /api/v1/resumes/tailor
///
/// Merged resume, merge report, laid-out blocks with `fits`, and ATS report.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<Arc<TailorOutcome>>, AppError> {
    Ok(Json(run_tailor(&state, request).await?))
}

async fn run_tailor(state: &AppState, mut request: TailorRequest) -> Result<Arc<TailorOutcome>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    let source = request.source();
    state
        .coordinator
        .tailor(
            request.raw_text,
            request.structured,
            request.job_description,
            &source,
        )
        .await
}

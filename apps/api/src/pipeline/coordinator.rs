//! Tailoring Coordinator: validate → proposal → merge → render → score.
//!
//! Stages run sequentially per request. The only await points are the
//! rewrite source (bounded by a timeout) and the blocking-pool hand-offs; the
//! CPU-bound stages run inside `tokio::task::spawn_blocking`. A missing, late,
//! or malformed proposal never fails the request: the canonical record is
//! merged with no proposal instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::ats::{score, AtsReport, ScoringSettings};
use crate::canonical::{validate, CanonicalResume};
use crate::errors::AppError;
use crate::layout::{render, Layout, TemplateConfig};
use crate::merge::{merge, parse_proposal_text, parse_proposal_value, MergedResume};
use crate::models::proposal::RewriteProposal;
use crate::models::resume::StructuredGuess;
use crate::pipeline::cache::{cache_key, SingleFlightCache};
use crate::pipeline::source::{RawProposal, RewriteSource};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub rewrite_timeout: Duration,
    pub target_years: f32,
    pub cache_capacity: usize,
    /// Fixed reference date for "Present" roles; today (UTC) when unset.
    pub as_of: Option<NaiveDate>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            rewrite_timeout: Duration::from_millis(20_000),
            target_years: 5.0,
            cache_capacity: 256,
            as_of: None,
        }
    }
}

/// Everything one tailoring run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TailorOutcome {
    pub cache_key: String,
    #[serde(flatten)]
    pub resume: MergedResume,
    pub layout: Layout,
    pub ats: AtsReport,
}

pub struct Coordinator {
    template: Arc<TemplateConfig>,
    settings: CoordinatorSettings,
    cache: SingleFlightCache<TailorOutcome>,
}

impl Coordinator {
    pub fn new(template: Arc<TemplateConfig>, settings: CoordinatorSettings) -> Self {
        let cache = SingleFlightCache::new(settings.cache_capacity);
        Coordinator {
            template,
            settings,
            cache,
        }
    }

    /// Runs the validator on the blocking pool.
    pub async fn validate(
        &self,
        raw_text: String,
        guess: StructuredGuess,
    ) -> Result<CanonicalResume, AppError> {
        let canonical = tokio::task::spawn_blocking(move || validate(&raw_text, guess))
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("spawn_blocking failed in validation: {e}"))
            })??;
        Ok(canonical)
    }

    /// Full pipeline. Results are cached by content hash; concurrent requests
    /// for the same input wait on a single computation.
    pub async fn tailor(
        &self,
        raw_text: String,
        guess: StructuredGuess,
        job_description: String,
        source: &dyn RewriteSource,
    ) -> Result<Arc<TailorOutcome>, AppError> {
        let span = info_span!("tailor", request_id = %Uuid::new_v4());
        async move {
            let canonical = self.validate(raw_text, guess).await?;
            let as_of = self.settings.as_of.unwrap_or_else(|| Utc::now().date_naive());
            let fingerprint = format!("{}@{as_of}", source.fingerprint());
            let key = cache_key(&canonical, &job_description, &fingerprint);

            let outcome = self
                .cache
                .get_or_try_insert_with(&key, || {
                    self.run(canonical, job_description, source, as_of, key.clone())
                })
                .await?;

            info!(
                cache_key = %outcome.cache_key,
                fits = outcome.layout.fits,
                trimmed = outcome.layout.trimmed.len(),
                ats_score = outcome.ats.ats_score,
                discarded = outcome.resume.report().discarded.len(),
                cached_entries = self.cache.len(),
                "Tailoring complete"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        canonical: CanonicalResume,
        job_description: String,
        source: &dyn RewriteSource,
        as_of: NaiveDate,
        key: String,
    ) -> Result<TailorOutcome, AppError> {
        let proposal = self.fetch_proposal(&canonical, &job_description, source).await;
        let template = Arc::clone(&self.template);
        let settings = ScoringSettings {
            target_years: self.settings.target_years,
            as_of,
        };

        tokio::task::spawn_blocking(move || {
            let resume = merge(&canonical, proposal.as_ref());
            let layout = render(&resume, &template);
            let ats = score(&resume, &job_description, &settings);
            TailorOutcome {
                cache_key: key,
                resume,
                layout,
                ats,
            }
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in tailoring: {e}")))
    }

    /// Asks the source for a proposal. Timeouts, source errors, and schema
    /// violations all degrade to `None`.
    async fn fetch_proposal(
        &self,
        canonical: &CanonicalResume,
        job_description: &str,
        source: &dyn RewriteSource,
    ) -> Option<RewriteProposal> {
        let timeout = self.settings.rewrite_timeout;
        let raw = match tokio::time::timeout(timeout, source.propose(canonical, job_description)).await
        {
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Rewrite source timed out; using canonical record"
                );
                return None;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Rewrite source failed; using canonical record");
                return None;
            }
            Ok(Ok(raw)) => raw?,
        };

        let parsed = match raw {
            RawProposal::Json(value) => parse_proposal_value(value),
            RawProposal::Text(text) => parse_proposal_text(&text),
        };
        match parsed {
            Ok(proposal) => Some(proposal),
            Err(e) => {
                warn!(error = %e, "Rewrite proposal rejected; using canonical record");
                None
            }
        }
    }
}

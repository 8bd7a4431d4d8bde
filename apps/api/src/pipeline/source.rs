//! Where rewrite proposals come from.
//!
//! The service itself never talks to a model. A `RewriteSource` hands the
//! coordinator a raw proposal (JSON value, or text that still needs fence
//! stripping); the coordinator bounds it with a timeout and treats any error
//! as "no proposal".

use async_trait::async_trait;
use serde_json::Value;

use crate::canonical::CanonicalResume;

/// A raw proposal as received from the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProposal {
    Json(Value),
    Text(String),
}

#[async_trait]
pub trait RewriteSource: Send + Sync {
    /// Stable identity of this source's output for a given input. Part of the
    /// cache key, so two sources that may answer differently must differ here.
    fn fingerprint(&self) -> String;

    async fn propose(
        &self,
        canonical: &CanonicalResume,
        job_description: &str,
    ) -> anyhow::Result<Option<RawProposal>>;
}

/// A proposal supplied up front by the caller, or none at all.
#[derive(Debug, Clone, Default)]
pub struct InlineProposal(pub Option<RawProposal>);

#[async_trait]
impl RewriteSource for InlineProposal {
    fn fingerprint(&self) -> String {
        match &self.0 {
            None => "none".to_string(),
            Some(RawProposal::Json(value)) => format!("json:{value}"),
            Some(RawProposal::Text(text)) => format!("text:{text}"),
        }
    }

    async fn propose(
        &self,
        _canonical: &CanonicalResume,
        _job_description: &str,
    ) -> anyhow::Result<Option<RawProposal>> {
        Ok(self.0.clone())
    }
}

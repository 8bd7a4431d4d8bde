// Rewrite merge: CanonicalResume + RewriteProposal -> MergedResume.
// Partial acceptance. Each overridable field is reduced on its own and every
// rejection falls back to canonical content.

pub mod merger;
pub mod proposal;

pub use merger::{merge, MergedResume};
pub use proposal::{parse_proposal_text, parse_proposal_value};

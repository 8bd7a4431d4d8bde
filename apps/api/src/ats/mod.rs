// ATS scoring: MergedResume + job description -> AtsReport.
// Weights are fixed at 0.40 skills, 0.30 keywords, 0.20 title, 0.10 experience.
// Recommendations come from an ordered rule table, never ad hoc branching.

pub mod recommendations;
pub mod scorer;
pub mod tokenize;

pub use scorer::{score, AtsReport, ScoringSettings};

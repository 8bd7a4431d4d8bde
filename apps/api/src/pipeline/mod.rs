// Tailoring pipeline: validate -> proposal -> merge -> render -> score.
// The rewrite source is external and time-bounded; everything after it is CPU-bound
// and runs on the blocking pool. Results are cached by content hash, single-flight.

pub mod cache;
pub mod coordinator;
pub mod handlers;
pub mod source;

pub use coordinator::{Coordinator, CoordinatorSettings, TailorOutcome};

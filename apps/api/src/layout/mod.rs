// Page-fit layout: MergedResume + TemplateConfig -> measured blocks + fits flag.
// Trimming is deterministic: oldest experience bullets go first.
// CPU-bound rendering must run inside tokio::task::spawn_blocking.

pub mod blocks;
pub mod font_metrics;
pub mod page_fit;
pub mod template;

pub use page_fit::{render, Layout};
pub use template::TemplateConfig;

use std::sync::Arc;

use crate::config::Config;
use crate::layout::TemplateConfig;
use crate::pipeline::Coordinator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Loaded once at startup; read-only for the life of the process.
    pub template: Arc<TemplateConfig>,
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(config: Config, template: TemplateConfig) -> Self {
        let template = Arc::new(template);
        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&template),
            config.coordinator_settings(),
        ));
        AppState {
            config,
            template,
            coordinator,
        }
    }
}

use degreeaudit_core::{AuditOrchestrator, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: AuditOrchestrator,
}

impl AppState {
    pub fn new(config: Config, orchestrator: AuditOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &AuditOrchestrator {
        &self.orchestrator
    }
}

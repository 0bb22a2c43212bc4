//! Build-time assembly of a pipeline from its configuration

use crate::core::{ConfigError, PipelineConfig};
use crate::provisioning::{EngineError, PipelineDefinition, StageBinder};
use thiserror::Error;
use tracing::info;

/// Fatal build-time error
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to register pipeline stages: {0}")]
    Engine(#[from] EngineError),
}

/// Validate, expand and bind a configured pipeline, then wire its
/// notification channel and status relay.
pub fn assemble(config: &PipelineConfig) -> Result<PipelineDefinition, BuildError> {
    let plan = config.expand()?;

    let mut definition = PipelineDefinition::new(&config.name, config.unique_id());
    StageBinder::new(&mut definition).bind(&plan)?;

    if config.notifications.enabled {
        definition.attach_failure_notification(config.notifications.topic_name.as_deref());
    }

    if let Some(relay) = &config.status_relay {
        let registration = definition.register_status_relay(&relay.secret_parameter);
        info!(
            "Status relay '{}' reports to {}",
            registration.handler, relay.repository
        );
    }

    info!(
        "Assembled pipeline '{}' with {} stages",
        definition.name,
        definition.stage_count()
    );
    Ok(definition)
}

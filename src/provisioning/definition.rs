//! In-process construction context handed to the provisioning engine

use crate::events::{EventPattern, PipelineState};
use crate::notify::{resource_name, FailureNotification, NotificationTopic};
use crate::provisioning::{EngineError, HookPosition, HookStep, ProvisioningEngine, StageDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Top-level entry of the synthesized pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefinitionEntry {
    Stage(StageDefinition),
    Wave(WaveDefinition),
}

/// A wave: hooks bracketing concurrently deployed stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre: Vec<HookStep>,

    pub stages: Vec<StageDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post: Vec<HookStep>,
}

/// Run-time handler registration for the build status relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRelayRegistration {
    pub handler: String,
    pub pattern: EventPattern,

    /// The only secret parameter the handler may read
    pub secret_parameter: String,
}

/// The pipeline being assembled. Threaded explicitly through every build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub unique_id: String,
    pub entries: Vec<DefinitionEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<FailureNotification>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_relay: Option<StatusRelayRegistration>,

    #[serde(skip)]
    stage_names: HashSet<String>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique_id: unique_id.into(),
            entries: Vec::new(),
            notifications: None,
            status_relay: None,
            stage_names: HashSet::new(),
        }
    }

    /// Create the failure topic and subscription, once.
    ///
    /// Later calls return the existing wiring unchanged.
    pub fn attach_failure_notification(&mut self, topic_name: Option<&str>) -> &FailureNotification {
        if self.notifications.is_some() {
            debug!("Failure notification already attached to '{}'", self.name);
        }
        let (name, unique_id) = (&self.name, &self.unique_id);
        self.notifications
            .get_or_insert_with(|| FailureNotification::new(name, unique_id, topic_name))
    }

    /// Failure-notification destination, for attaching further subscribers
    pub fn failure_topic(&self) -> Option<&NotificationTopic> {
        self.notifications.as_ref().map(|n| &n.topic)
    }

    /// Register the status relay for every execution state change
    pub fn register_status_relay(&mut self, secret_parameter: &str) -> &StatusRelayRegistration {
        let registration = StatusRelayRegistration {
            handler: resource_name(&self.name, &self.unique_id, "status"),
            pattern: EventPattern::for_pipeline(&self.name, &PipelineState::ALL),
            secret_parameter: secret_parameter.to_string(),
        };
        self.status_relay.insert(registration)
    }

    /// Number of deployment stages, counting wave members
    pub fn stage_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                DefinitionEntry::Stage(_) => 1,
                DefinitionEntry::Wave(wave) => wave.stages.len(),
            })
            .sum()
    }

    pub fn wave(&self, name: &str) -> Option<&WaveDefinition> {
        self.entries.iter().find_map(|entry| match entry {
            DefinitionEntry::Wave(wave) if wave.name == name => Some(wave),
            _ => None,
        })
    }

    fn wave_mut(&mut self, name: &str) -> Result<&mut WaveDefinition, EngineError> {
        self.entries
            .iter_mut()
            .find_map(|entry| match entry {
                DefinitionEntry::Wave(wave) if wave.name == name => Some(wave),
                _ => None,
            })
            .ok_or_else(|| EngineError::UnknownWave(name.to_string()))
    }

    fn claim_stage_name(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.stage_names.insert(name.to_string()) {
            return Err(EngineError::DuplicateStage(name.to_string()));
        }
        Ok(())
    }
}

impl ProvisioningEngine for PipelineDefinition {
    fn add_stage(&mut self, stage: StageDefinition) -> Result<(), EngineError> {
        self.claim_stage_name(&stage.name)?;
        self.entries.push(DefinitionEntry::Stage(stage));
        Ok(())
    }

    fn add_wave(&mut self, name: &str) -> Result<(), EngineError> {
        if self.wave(name).is_some() {
            return Err(EngineError::DuplicateWave(name.to_string()));
        }
        self.entries.push(DefinitionEntry::Wave(WaveDefinition {
            name: name.to_string(),
            pre: Vec::new(),
            stages: Vec::new(),
            post: Vec::new(),
        }));
        Ok(())
    }

    fn add_wave_stage(&mut self, wave: &str, stage: StageDefinition) -> Result<(), EngineError> {
        // Resolve the wave first so an unknown wave does not claim the name
        self.wave_mut(wave)?;
        self.claim_stage_name(&stage.name)?;
        self.wave_mut(wave)?.stages.push(stage);
        Ok(())
    }

    fn add_wave_hook(
        &mut self,
        wave: &str,
        position: HookPosition,
        step: HookStep,
    ) -> Result<(), EngineError> {
        let wave = self.wave_mut(wave)?;
        match position {
            HookPosition::Pre => wave.pre.push(step),
            HookPosition::Post => wave.post.push(step),
        }
        Ok(())
    }
}

//! Provisioning engine seam
//!
//! The engine owns stage sequencing and wave concurrency. This crate only
//! registers stages with it, through the [`ProvisioningEngine`] trait.

pub mod assembly;
pub mod binder;
pub mod definition;

pub use assembly::{assemble, BuildError};
pub use binder::StageBinder;
pub use definition::{DefinitionEntry, PipelineDefinition, StatusRelayRegistration, WaveDefinition};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by the engine while registering stages
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Stage '{0}' is already registered")]
    DuplicateStage(String),

    #[error("Wave '{0}' is already registered")]
    DuplicateWave(String),

    #[error("Wave '{0}' has not been registered")]
    UnknownWave(String),
}

/// Where a hook block runs relative to its stage or wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPosition {
    Pre,
    Post,
}

/// A block of shell commands with scoped environment variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStep {
    pub name: String,
    pub commands: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// A deployment stage as handed to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<HookStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<HookStep>,
}

/// Stage-creation primitives of the provisioning engine
pub trait ProvisioningEngine {
    /// Append a sequential stage
    fn add_stage(&mut self, stage: StageDefinition) -> Result<(), EngineError>;

    /// Append a wave; stages added to it run concurrently
    fn add_wave(&mut self, name: &str) -> Result<(), EngineError>;

    /// Add a stage to a registered wave
    fn add_wave_stage(&mut self, wave: &str, stage: StageDefinition) -> Result<(), EngineError>;

    /// Attach a hook that runs once before or after all stages of a wave
    fn add_wave_hook(
        &mut self,
        wave: &str,
        position: HookPosition,
        step: HookStep,
    ) -> Result<(), EngineError>;
}

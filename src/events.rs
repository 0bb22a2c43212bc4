//! Pipeline execution state-change events emitted by the provisioning engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event source of the provisioning engine
pub const EVENT_SOURCE: &str = "aws.codepipeline";

/// Detail type of execution state-change events
pub const EXECUTION_STATE_CHANGE: &str = "CodePipeline Pipeline Execution State Change";

/// Execution states reported by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Started,
    Resumed,
    Succeeded,
    Failed,
    Stopping,
    Stopped,
    Superseded,
    Canceled,
}

impl PipelineState {
    pub const ALL: [PipelineState; 8] = [
        PipelineState::Started,
        PipelineState::Resumed,
        PipelineState::Succeeded,
        PipelineState::Failed,
        PipelineState::Stopping,
        PipelineState::Stopped,
        PipelineState::Superseded,
        PipelineState::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Started => "STARTED",
            PipelineState::Resumed => "RESUMED",
            PipelineState::Succeeded => "SUCCEEDED",
            PipelineState::Failed => "FAILED",
            PipelineState::Stopping => "STOPPING",
            PipelineState::Stopped => "STOPPED",
            PipelineState::Superseded => "SUPERSEDED",
            PipelineState::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub pipeline: String,

    #[serde(rename = "execution-id")]
    pub execution_id: String,

    pub state: PipelineState,
}

/// Envelope the event bus delivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "detail-type", default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub detail: StateChangeEvent,
}

impl StateChangeEvent {
    pub fn new(pipeline: impl Into<String>, execution_id: impl Into<String>, state: PipelineState) -> Self {
        Self {
            pipeline: pipeline.into(),
            execution_id: execution_id.into(),
            state,
        }
    }

    /// Parse an event from its JSON envelope
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_str(json)?;
        Ok(envelope.detail)
    }
}

/// Filter a subscription applies to the event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPattern {
    pub source: String,
    pub detail_type: String,
    pub pipeline: String,
    pub states: Vec<PipelineState>,
}

impl EventPattern {
    pub fn for_pipeline(pipeline: impl Into<String>, states: &[PipelineState]) -> Self {
        Self {
            source: EVENT_SOURCE.to_string(),
            detail_type: EXECUTION_STATE_CHANGE.to_string(),
            pipeline: pipeline.into(),
            states: states.to_vec(),
        }
    }

    pub fn matches(&self, event: &StateChangeEvent) -> bool {
        event.pipeline == self.pipeline && self.states.contains(&event.state)
    }
}

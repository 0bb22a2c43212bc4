//! Commit status model

use crate::events::PipelineState;
use serde::{Deserialize, Serialize};

/// State accepted by the repository status API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl From<PipelineState> for StatusState {
    fn from(state: PipelineState) -> Self {
        match state {
            PipelineState::Started | PipelineState::Resumed => StatusState::Pending,
            PipelineState::Succeeded => StatusState::Success,
            PipelineState::Failed => StatusState::Failure,
            PipelineState::Stopping
            | PipelineState::Stopped
            | PipelineState::Superseded
            | PipelineState::Canceled => StatusState::Error,
        }
    }
}

/// One status report for one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub sha: String,
    pub state: StatusState,
    pub context: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

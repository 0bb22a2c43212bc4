//! Expanded execution plan

use serde::Serialize;
use std::collections::BTreeMap;

/// Environment variable carrying the wave a stage belongs to
pub const WAVE_NAME_VAR: &str = "WAVE_NAME";

/// Environment variable carrying the environment a stage deploys
pub const ENV_NAME_VAR: &str = "ENV_NAME";

/// What an expanded stage stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Deployment of one environment
    Environment,
    /// Wave-level pre hook, runs once before the wave's environments
    WavePre,
    /// Wave-level post hook, runs once after the wave's environments
    WavePost,
}

/// One unit of pipeline execution after hook merging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedStage {
    /// Stage name, unique within the plan
    pub name: String,

    pub kind: StageKind,

    /// Wave the stage belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave: Option<String>,

    /// Merged pre-hook commands
    pub pre: Vec<String>,

    /// Merged post-hook commands
    pub post: Vec<String>,

    /// Variables scoped to this stage's hooks
    pub env: BTreeMap<String, String>,
}

impl ExpandedStage {
    /// Environments inside a wave run alongside their siblings
    pub fn is_concurrent(&self) -> bool {
        self.kind == StageKind::Environment && self.wave.is_some()
    }

    pub fn has_hooks(&self) -> bool {
        !self.pre.is_empty() || !self.post.is_empty()
    }
}

/// Ordered output of topology expansion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    stages: Vec<ExpandedStage>,
}

impl ExecutionPlan {
    pub(crate) fn new(stages: Vec<ExpandedStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[ExpandedStage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&ExpandedStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Group stages into sequential phases.
    ///
    /// Consecutive concurrent stages of the same wave share a phase; every
    /// other stage is a phase of its own. Phase N starts only after phase N-1
    /// has fully succeeded.
    pub fn phases(&self) -> Vec<Vec<&ExpandedStage>> {
        let mut phases: Vec<Vec<&ExpandedStage>> = Vec::new();

        for stage in &self.stages {
            let joins_previous = stage.is_concurrent()
                && phases
                    .last()
                    .and_then(|phase| phase.last())
                    .map(|prev| prev.is_concurrent() && prev.wave == stage.wave)
                    .unwrap_or(false);

            if joins_previous {
                if let Some(phase) = phases.last_mut() {
                    phase.push(stage);
                }
            } else {
                phases.push(vec![stage]);
            }
        }

        phases
    }
}

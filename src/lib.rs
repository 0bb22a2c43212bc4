//! waveline - wave-based delivery pipeline assembly and build status relay

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod events;
pub mod notify;
pub mod provisioning;
pub mod relay;

// Re-export commonly used types
pub use crate::core::{
    ConfigError, EnvironmentDeployment, ExecutionPlan, ExpandedStage, PipelineConfig, PipelineStep,
    TopologyExpander, WaveDeployment,
};
pub use dispatch::{dispatch, DispatchError, EventOutcome};
pub use events::{PipelineState, StateChangeEvent};
pub use notify::{FailureForwarder, FailureNotification, NotificationSink};
pub use provisioning::{assemble, BuildError, PipelineDefinition, ProvisioningEngine, StageBinder};
pub use relay::{
    BuildStatusRelay, ExecutionDetailResolver, RelayError, RelayOutcome, RepositoryStatusClient,
    SecretStore,
};

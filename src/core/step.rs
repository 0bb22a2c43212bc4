//! Declared pipeline steps: single environments and waves

use serde::{Deserialize, Serialize};

/// One target deployment environment with its own hooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentDeployment {
    /// Environment (stage) name
    pub environment: String,

    /// Commands run before the deployment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre: Vec<String>,

    /// Commands run after the deployment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post: Vec<String>,
}

impl EnvironmentDeployment {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn with_pre(mut self, commands: &[&str]) -> Self {
        self.pre = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_post(mut self, commands: &[&str]) -> Self {
        self.post = commands.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// A named group of environments deployed concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDeployment {
    /// Wave name
    pub wave: String,

    /// Environments in declaration order
    pub environments: Vec<EnvironmentDeployment>,

    /// Commands prepended to every environment's pre hook
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_each_environment: Vec<String>,

    /// Commands appended to every environment's post hook
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_each_environment: Vec<String>,

    /// Commands run once before the whole wave
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre: Vec<String>,

    /// Commands run once after the whole wave
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post: Vec<String>,
}

impl WaveDeployment {
    pub fn new(wave: impl Into<String>, environments: Vec<EnvironmentDeployment>) -> Self {
        Self {
            wave: wave.into(),
            environments,
            pre_each_environment: Vec::new(),
            post_each_environment: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }
}

/// One element of the declared pipeline sequence.
///
/// The variant is decided by the presence of a `wave` key when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawStep")]
pub enum PipelineStep {
    Wave(WaveDeployment),
    Environment(EnvironmentDeployment),
}

impl PipelineStep {
    /// Name of the wave or environment
    pub fn name(&self) -> &str {
        match self {
            PipelineStep::Wave(wave) => &wave.wave,
            PipelineStep::Environment(env) => &env.environment,
        }
    }
}

impl From<WaveDeployment> for PipelineStep {
    fn from(wave: WaveDeployment) -> Self {
        PipelineStep::Wave(wave)
    }
}

impl From<EnvironmentDeployment> for PipelineStep {
    fn from(env: EnvironmentDeployment) -> Self {
        PipelineStep::Environment(env)
    }
}

/// Flat shape accepted from YAML before the variant is known
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    #[serde(default)]
    wave: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    environments: Option<Vec<EnvironmentDeployment>>,
    #[serde(default)]
    pre: Vec<String>,
    #[serde(default)]
    post: Vec<String>,
    #[serde(default, alias = "preEachEnvironment")]
    pre_each_environment: Option<Vec<String>>,
    #[serde(default, alias = "postEachEnvironment")]
    post_each_environment: Option<Vec<String>>,
}

impl TryFrom<RawStep> for PipelineStep {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        match (raw.wave, raw.environment) {
            (Some(wave), None) => Ok(PipelineStep::Wave(WaveDeployment {
                wave,
                // Missing and empty lists are both rejected during validation
                environments: raw.environments.unwrap_or_default(),
                pre_each_environment: raw.pre_each_environment.unwrap_or_default(),
                post_each_environment: raw.post_each_environment.unwrap_or_default(),
                pre: raw.pre,
                post: raw.post,
            })),
            (None, Some(environment)) => {
                if raw.environments.is_some() {
                    return Err(format!(
                        "environment '{}' declares `environments`; only waves group environments",
                        environment
                    ));
                }
                if raw.pre_each_environment.is_some() || raw.post_each_environment.is_some() {
                    return Err(format!(
                        "environment '{}' declares per-environment wave hooks; use `pre`/`post` instead",
                        environment
                    ));
                }
                Ok(PipelineStep::Environment(EnvironmentDeployment {
                    environment,
                    pre: raw.pre,
                    post: raw.post,
                }))
            }
            (Some(wave), Some(environment)) => Err(format!(
                "step declares both wave '{}' and environment '{}'",
                wave, environment
            )),
            (None, None) => Err("step must declare either `wave` or `environment`".to_string()),
        }
    }
}

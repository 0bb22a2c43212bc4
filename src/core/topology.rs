//! Topology expansion: declared waves and environments into ordered stages

use crate::core::{
    error::ConfigError,
    plan::{ExecutionPlan, ExpandedStage, StageKind, ENV_NAME_VAR, WAVE_NAME_VAR},
    step::{EnvironmentDeployment, PipelineStep, WaveDeployment},
};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("static regex"))
}

/// Check a wave, environment or pipeline name
pub(crate) fn check_name(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::BlankName { kind });
    }
    if !name_pattern().is_match(name) {
        return Err(ConfigError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Turns the declared pipeline sequence into an [`ExecutionPlan`].
///
/// Pure and deterministic. Top-level order is preserved and environments
/// inside a wave keep their declaration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopologyExpander;

impl TopologyExpander {
    pub fn new() -> Self {
        Self
    }

    pub fn expand(&self, steps: &[PipelineStep]) -> Result<ExecutionPlan, ConfigError> {
        let mut stages = Vec::new();
        let mut waves = HashSet::new();

        for step in steps {
            match step {
                PipelineStep::Environment(env) => {
                    check_name("Environment", &env.environment)?;
                    stages.push(Self::environment_stage(env, None, &[], &[]));
                }
                PipelineStep::Wave(wave) => {
                    if !waves.insert(wave.wave.as_str()) {
                        return Err(ConfigError::DuplicateWave(wave.wave.clone()));
                    }
                    Self::expand_wave(wave, &mut stages)?
                }
            }
        }

        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(ConfigError::DuplicateStage(stage.name.clone()));
            }
        }

        debug!("Expanded {} declared steps into {} stages", steps.len(), stages.len());
        Ok(ExecutionPlan::new(stages))
    }

    fn expand_wave(wave: &WaveDeployment, stages: &mut Vec<ExpandedStage>) -> Result<(), ConfigError> {
        check_name("Wave", &wave.wave)?;
        if wave.environments.is_empty() {
            return Err(ConfigError::EmptyWave(wave.wave.clone()));
        }

        let mut seen = HashSet::new();
        for env in &wave.environments {
            check_name("Environment", &env.environment)?;
            if !seen.insert(env.environment.as_str()) {
                return Err(ConfigError::DuplicateEnvironmentInWave {
                    wave: wave.wave.clone(),
                    environment: env.environment.clone(),
                });
            }
        }

        if !wave.pre.is_empty() {
            stages.push(Self::wave_hook_stage(wave, StageKind::WavePre));
        }

        for env in &wave.environments {
            stages.push(Self::environment_stage(
                env,
                Some(&wave.wave),
                &wave.pre_each_environment,
                &wave.post_each_environment,
            ));
        }

        if !wave.post.is_empty() {
            stages.push(Self::wave_hook_stage(wave, StageKind::WavePost));
        }

        debug!(
            "Wave '{}' expanded to {} environments (pre: {}, post: {})",
            wave.wave,
            wave.environments.len(),
            !wave.pre.is_empty(),
            !wave.post.is_empty()
        );
        Ok(())
    }

    /// Wave hooks bracket environment hooks on both sides
    fn environment_stage(
        env: &EnvironmentDeployment,
        wave: Option<&str>,
        pre_each: &[String],
        post_each: &[String],
    ) -> ExpandedStage {
        let pre = pre_each.iter().chain(&env.pre).cloned().collect();
        let post = env.post.iter().chain(post_each).cloned().collect();

        let mut vars = BTreeMap::new();
        vars.insert(ENV_NAME_VAR.to_string(), env.environment.clone());
        if let Some(wave) = wave {
            vars.insert(WAVE_NAME_VAR.to_string(), wave.to_string());
        }

        ExpandedStage {
            name: env.environment.clone(),
            kind: StageKind::Environment,
            wave: wave.map(str::to_string),
            pre,
            post,
            env: vars,
        }
    }

    fn wave_hook_stage(wave: &WaveDeployment, kind: StageKind) -> ExpandedStage {
        let (suffix, pre, post) = match kind {
            StageKind::WavePost => ("post", Vec::new(), wave.post.clone()),
            _ => ("pre", wave.pre.clone(), Vec::new()),
        };

        let mut vars = BTreeMap::new();
        vars.insert(WAVE_NAME_VAR.to_string(), wave.wave.clone());

        ExpandedStage {
            name: format!("{}-{}", wave.wave, suffix),
            kind,
            wave: Some(wave.wave.clone()),
            pre,
            post,
            env: vars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wave_hooks_bracket_environment_hooks() {
        let mut wave = WaveDeployment::new(
            "prod",
            vec![EnvironmentDeployment::new("us").with_pre(&["C"]).with_post(&["D"])],
        );
        wave.pre_each_environment = strings(&["A"]);
        wave.post_each_environment = strings(&["B"]);

        let plan = TopologyExpander::new().expand(&[wave.into()]).unwrap();
        let us = plan.stage("us").unwrap();

        assert_eq!(us.pre, strings(&["A", "C"]));
        assert_eq!(us.post, strings(&["D", "B"]));
        assert_eq!(us.env.get(WAVE_NAME_VAR), Some(&"prod".to_string()));
        assert_eq!(us.env.get(ENV_NAME_VAR), Some(&"us".to_string()));
    }

    #[test]
    fn test_single_environment_keeps_own_hooks() {
        let env = EnvironmentDeployment::new("dev").with_pre(&["lint"]).with_post(&["smoke"]);
        let plan = TopologyExpander::new().expand(&[env.into()]).unwrap();

        let dev = plan.stage("dev").unwrap();
        assert_eq!(dev.pre, strings(&["lint"]));
        assert_eq!(dev.post, strings(&["smoke"]));
        assert_eq!(dev.env.len(), 1);
        assert!(!dev.is_concurrent());
    }

    #[test]
    fn test_environment_without_hooks_still_gets_env_name() {
        let plan = TopologyExpander::new()
            .expand(&[EnvironmentDeployment::new("dev").into()])
            .unwrap();
        let dev = plan.stage("dev").unwrap();
        assert!(!dev.has_hooks());
        assert_eq!(dev.env.get(ENV_NAME_VAR), Some(&"dev".to_string()));
    }

    #[test]
    fn test_wave_level_hooks_become_bracketing_stages() {
        let mut wave = WaveDeployment::new(
            "prod",
            vec![EnvironmentDeployment::new("us"), EnvironmentDeployment::new("eu")],
        );
        wave.pre = strings(&["approve"]);
        wave.post = strings(&["notify"]);

        let plan = TopologyExpander::new().expand(&[wave.into()]).unwrap();
        let names: Vec<&str> = plan.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["prod-pre", "us", "eu", "prod-post"]);

        let pre = plan.stage("prod-pre").unwrap();
        assert_eq!(pre.kind, StageKind::WavePre);
        assert_eq!(pre.pre, strings(&["approve"]));
        assert!(pre.post.is_empty());
        assert_eq!(pre.env.get(WAVE_NAME_VAR), Some(&"prod".to_string()));
        assert!(pre.env.get(ENV_NAME_VAR).is_none());

        let post = plan.stage("prod-post").unwrap();
        assert_eq!(post.kind, StageKind::WavePost);
        assert_eq!(post.post, strings(&["notify"]));
    }

    #[test]
    fn test_empty_wave_rejected() {
        let wave = WaveDeployment::new("prod", vec![]);
        let err = TopologyExpander::new().expand(&[wave.into()]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyWave(ref name) if name == "prod"));
    }

    #[test]
    fn test_duplicate_environment_in_wave_rejected() {
        let wave = WaveDeployment::new(
            "prod",
            vec![EnvironmentDeployment::new("us"), EnvironmentDeployment::new("us")],
        );
        let err = TopologyExpander::new().expand(&[wave.into()]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEnvironmentInWave { .. }));
    }

    #[test]
    fn test_duplicate_stage_across_pipeline_rejected() {
        let steps = vec![
            EnvironmentDeployment::new("us").into(),
            WaveDeployment::new("prod", vec![EnvironmentDeployment::new("us")]).into(),
        ];
        let err = TopologyExpander::new().expand(&steps).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStage(ref name) if name == "us"));
    }

    #[test]
    fn test_duplicate_wave_rejected() {
        let steps = vec![
            WaveDeployment::new("prod", vec![EnvironmentDeployment::new("us")]).into(),
            WaveDeployment::new("prod", vec![EnvironmentDeployment::new("eu")]).into(),
        ];
        let err = TopologyExpander::new().expand(&steps).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateWave(ref name) if name == "prod"));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let err = TopologyExpander::new()
            .expand(&[EnvironmentDeployment::new("  ").into()])
            .unwrap_err();
        assert!(matches!(err, ConfigError::BlankName { .. }));

        let err = TopologyExpander::new()
            .expand(&[EnvironmentDeployment::new("us east").into()])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidName { .. }));
    }
}

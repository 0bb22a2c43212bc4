//! Binds expanded stages to the provisioning engine

use crate::core::{ExecutionPlan, ExpandedStage, StageKind};
use crate::provisioning::{EngineError, HookPosition, HookStep, ProvisioningEngine, StageDefinition};
use tracing::{debug, info};

/// Registers an [`ExecutionPlan`] with a [`ProvisioningEngine`] in plan order
pub struct StageBinder<'a, E> {
    engine: &'a mut E,
    current_wave: Option<String>,
}

impl<'a, E: ProvisioningEngine> StageBinder<'a, E> {
    pub fn new(engine: &'a mut E) -> Self {
        Self {
            engine,
            current_wave: None,
        }
    }

    /// Bind every stage of the plan. The first registration failure aborts.
    pub fn bind(mut self, plan: &ExecutionPlan) -> Result<(), EngineError> {
        for stage in plan.stages() {
            self.bind_stage(stage)?;
        }
        info!("Bound {} stages to the provisioning engine", plan.len());
        Ok(())
    }

    fn bind_stage(&mut self, stage: &ExpandedStage) -> Result<(), EngineError> {
        let Some(wave) = stage.wave.as_deref() else {
            self.current_wave = None;
            debug!("Adding stage '{}'", stage.name);
            return self.engine.add_stage(Self::stage_definition(stage));
        };

        if self.current_wave.as_deref() != Some(wave) {
            debug!("Adding wave '{}'", wave);
            self.engine.add_wave(wave)?;
            self.current_wave = Some(wave.to_string());
        }

        match stage.kind {
            StageKind::Environment => {
                debug!("Adding stage '{}' to wave '{}'", stage.name, wave);
                self.engine.add_wave_stage(wave, Self::stage_definition(stage))
            }
            StageKind::WavePre => self.engine.add_wave_hook(
                wave,
                HookPosition::Pre,
                Self::hook(&stage.name, &stage.pre, stage),
            ),
            StageKind::WavePost => self.engine.add_wave_hook(
                wave,
                HookPosition::Post,
                Self::hook(&stage.name, &stage.post, stage),
            ),
        }
    }

    fn stage_definition(stage: &ExpandedStage) -> StageDefinition {
        let pre = (!stage.pre.is_empty())
            .then(|| Self::hook(&format!("{}-pre", stage.name), &stage.pre, stage));
        let post = (!stage.post.is_empty())
            .then(|| Self::hook(&format!("{}-post", stage.name), &stage.post, stage));

        StageDefinition {
            name: stage.name.clone(),
            pre,
            post,
        }
    }

    fn hook(name: &str, commands: &[String], stage: &ExpandedStage) -> HookStep {
        HookStep {
            name: name.to_string(),
            commands: commands.to_vec(),
            env: stage.env.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EnvironmentDeployment, TopologyExpander, WaveDeployment};

    /// Records every engine call in order
    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<String>,
        fail_on: Option<String>,
    }

    impl ProvisioningEngine for RecordingEngine {
        fn add_stage(&mut self, stage: StageDefinition) -> Result<(), EngineError> {
            if self.fail_on.as_deref() == Some(stage.name.as_str()) {
                return Err(EngineError::DuplicateStage(stage.name));
            }
            self.calls.push(format!(
                "stage:{} pre={} post={}",
                stage.name,
                stage.pre.is_some(),
                stage.post.is_some()
            ));
            Ok(())
        }

        fn add_wave(&mut self, name: &str) -> Result<(), EngineError> {
            self.calls.push(format!("wave:{}", name));
            Ok(())
        }

        fn add_wave_stage(&mut self, wave: &str, stage: StageDefinition) -> Result<(), EngineError> {
            self.calls.push(format!("wave-stage:{}/{}", wave, stage.name));
            Ok(())
        }

        fn add_wave_hook(
            &mut self,
            wave: &str,
            position: HookPosition,
            step: HookStep,
        ) -> Result<(), EngineError> {
            self.calls
                .push(format!("wave-hook:{}/{:?}/{}", wave, position, step.commands.join(";")));
            Ok(())
        }
    }

    #[test]
    fn test_binding_order_matches_expansion_order() {
        let mut wave = WaveDeployment::new(
            "prod",
            vec![EnvironmentDeployment::new("us"), EnvironmentDeployment::new("eu")],
        );
        wave.pre = vec!["approve".to_string()];
        wave.post = vec!["announce".to_string()];

        let plan = TopologyExpander::new()
            .expand(&[
                EnvironmentDeployment::new("dev").with_pre(&["lint"]).into(),
                wave.into(),
                EnvironmentDeployment::new("dr").into(),
            ])
            .unwrap();

        let mut engine = RecordingEngine::default();
        StageBinder::new(&mut engine).bind(&plan).unwrap();

        assert_eq!(
            engine.calls,
            vec![
                "stage:dev pre=true post=false",
                "wave:prod",
                "wave-hook:prod/Pre/approve",
                "wave-stage:prod/us",
                "wave-stage:prod/eu",
                "wave-hook:prod/Post/announce",
                "stage:dr pre=false post=false",
            ]
        );
    }

    #[test]
    fn test_hooks_carry_stage_variables() {
        let mut wave = WaveDeployment::new("prod", vec![EnvironmentDeployment::new("us")]);
        wave.post_each_environment = vec!["verify".to_string()];
        let plan = TopologyExpander::new().expand(&[wave.into()]).unwrap();

        let definition = StageBinder::<RecordingEngine>::stage_definition(&plan.stages()[0]);
        let post = definition.post.unwrap();
        assert_eq!(post.name, "us-post");
        assert_eq!(post.commands, vec!["verify"]);
        assert_eq!(post.env.get("WAVE_NAME"), Some(&"prod".to_string()));
        assert_eq!(post.env.get("ENV_NAME"), Some(&"us".to_string()));
        assert!(definition.pre.is_none());
    }

    #[test]
    fn test_registration_failure_aborts() {
        let plan = TopologyExpander::new()
            .expand(&[
                EnvironmentDeployment::new("dev").into(),
                EnvironmentDeployment::new("qa").into(),
            ])
            .unwrap();

        let mut engine = RecordingEngine {
            fail_on: Some("dev".to_string()),
            ..Default::default()
        };
        let err = StageBinder::new(&mut engine).bind(&plan).unwrap_err();
        assert_eq!(err, EngineError::DuplicateStage("dev".to_string()));
        assert!(engine.calls.is_empty());
    }
}

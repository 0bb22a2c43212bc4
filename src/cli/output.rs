//! CLI output formatting

use crate::core::{ExecutionPlan, ExpandedStage, StageKind};
use crate::provisioning::PipelineDefinition;
use crate::relay::{RelayOutcome, StatusState};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static WAVE: Emoji<'_, '_> = Emoji("🌊 ", "~ ");

/// Format one expanded stage for display
pub fn format_stage(stage: &ExpandedStage) -> String {
    let label = match stage.kind {
        StageKind::Environment => style(&stage.name).cyan().to_string(),
        StageKind::WavePre | StageKind::WavePost => style(&stage.name).yellow().to_string(),
    };

    let mut line = label;
    if !stage.pre.is_empty() {
        line.push_str(&format!(" pre: [{}]", stage.pre.join(", ")));
    }
    if !stage.post.is_empty() {
        line.push_str(&format!(" post: [{}]", stage.post.join(", ")));
    }
    if !stage.has_hooks() {
        line.push_str(&format!(" {}", style("(no hooks)").dim()));
    }
    line
}

/// Format the plan as numbered sequential phases
pub fn format_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();

    for (index, phase) in plan.phases().iter().enumerate() {
        let concurrent = phase.len() > 1 || phase.iter().any(|s| s.is_concurrent());
        let marker = if concurrent {
            let wave = phase[0].wave.as_deref().unwrap_or_default();
            format!("{}{}", WAVE, style(format!("wave {} (concurrent)", wave)).dim())
        } else {
            String::new()
        };

        out.push_str(&format!("  {}. {}\n", index + 1, marker));
        for stage in phase {
            out.push_str(&format!("     - {}\n", format_stage(stage)));
        }
    }

    out
}

/// One-line summary of an assembled definition
pub fn format_definition_summary(definition: &PipelineDefinition) -> String {
    let topic = definition
        .failure_topic()
        .map(|t| t.name.clone())
        .unwrap_or_else(|| "disabled".to_string());
    let relay = definition
        .status_relay
        .as_ref()
        .map(|r| r.handler.clone())
        .unwrap_or_else(|| "disabled".to_string());

    format!(
        "{} {} stages, notifications: {}, status relay: {}",
        style(&definition.name).bold(),
        style(definition.stage_count()).cyan(),
        style(topic).dim(),
        style(relay).dim()
    )
}

/// Format a relay outcome for display
pub fn format_relay_outcome(outcome: &RelayOutcome) -> String {
    match outcome {
        RelayOutcome::Reported { status, .. } => {
            let state = match status.state {
                StatusState::Success => style("success").green(),
                StatusState::Pending => style("pending").yellow(),
                StatusState::Failure => style("failure").red(),
                StatusState::Error => style("error").red(),
            };
            format!(
                "{} Reported {} for {} ({})",
                CHECK,
                state,
                style(&status.sha).cyan(),
                style(&status.context).dim()
            )
        }
        RelayOutcome::Ignored { reason } => format!("{} Ignored: {}", WARN, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EnvironmentDeployment, TopologyExpander, WaveDeployment};

    #[test]
    fn test_format_plan_marks_concurrent_wave() {
        console::set_colors_enabled(false);
        let plan = TopologyExpander::new()
            .expand(&[
                EnvironmentDeployment::new("dev").into(),
                WaveDeployment::new(
                    "prod",
                    vec![EnvironmentDeployment::new("us"), EnvironmentDeployment::new("eu")],
                )
                .into(),
            ])
            .unwrap();

        let out = format_plan(&plan);
        assert!(out.contains("1. "));
        assert!(out.contains("- dev (no hooks)"));
        assert!(out.contains("wave prod (concurrent)"));
        assert!(out.contains("- us"));
        assert!(out.contains("- eu"));
    }
}

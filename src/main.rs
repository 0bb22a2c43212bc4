use anyhow::{Context, Result};
use std::io::Read;
use tracing::{error, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use waveline::cli::commands::{PlanCommand, RelayCommand, SynthCommand, ValidateCommand};
use waveline::cli::output::*;
use waveline::cli::{Cli, Command};
use waveline::core::PipelineConfig;
use waveline::dispatch::dispatch;
use waveline::events::StateChangeEvent;
use waveline::notify::{FailureForwarder, FailureNotification, WebhookNotificationSink};
use waveline::provisioning::assemble;
use waveline::relay::{
    BuildStatusRelay, EnvSecretStore, GitHubStatusClient, HttpExecutionResolver, RelaySettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG overrides the default level
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let result = match &cli.command {
        Command::Validate(cmd) => validate_pipeline(cmd),
        Command::Plan(cmd) => show_plan(cmd),
        Command::Synth(cmd) => synth_pipeline(cmd),
        Command::Relay(cmd) => relay_event(cmd).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("{} {}", CROSS, style(format!("{:#}", e)).red());
        std::process::exit(1);
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    eprintln!("{} Validating pipeline...", INFO);

    let config = PipelineConfig::from_file(&cmd.file).context("Validation failed")?;
    let plan = config.expand()?;

    println!("{} Pipeline configuration is valid!", CHECK);
    println!("  Name: {}", style(&config.name).bold());
    println!("  Environments: {}", style(config.environment_count()).cyan());
    println!("  Stages: {}", style(plan.len()).cyan());

    if cmd.json {
        let json = serde_json::to_string_pretty(&config)?;
        println!("\n{}", json);
    }
    Ok(())
}

fn show_plan(cmd: &PlanCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let plan = config.expand()?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{} Execution plan for {}:", INFO, style(&config.name).bold());
        print!("{}", format_plan(&plan));
    }
    Ok(())
}

fn synth_pipeline(cmd: &SynthCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let definition = assemble(&config)?;
    let json = serde_json::to_string_pretty(&definition)?;

    match &cmd.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path))?;
            eprintln!("{} Wrote {}", CHECK, style(path).cyan());
        }
        None => println!("{}", json),
    }
    eprintln!("{} {}", INFO, format_definition_summary(&definition));
    Ok(())
}

async fn relay_event(cmd: &RelayCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let relay_config = config
        .status_relay
        .as_ref()
        .context("Pipeline config has no status_relay section")?;

    let payload = if cmd.event == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&cmd.event)
            .with_context(|| format!("Failed to read event {}", cmd.event))?
    };
    let event = StateChangeEvent::from_json(&payload).context("Failed to parse event")?;

    let settings = RelaySettings::from_config(&config.name, relay_config)?;
    let secrets = match &cmd.secret_env_prefix {
        Some(prefix) => EnvSecretStore::with_prefix(prefix),
        None => EnvSecretStore::new(),
    };
    let relay = BuildStatusRelay::new(
        settings,
        HttpExecutionResolver::new(&cmd.execution_api_url)?,
        secrets,
        GitHubStatusClient::new(&cmd.github_api_url)?,
    );

    // A broken webhook must not keep the status from being relayed
    let mut sink_error = None;
    let forwarder = match &cmd.notify_webhook {
        Some(url) if config.notifications.enabled => match WebhookNotificationSink::new(url) {
            Ok(sink) => {
                let notification = FailureNotification::new(
                    &config.name,
                    config.unique_id(),
                    config.notifications.topic_name.as_deref(),
                );
                Some(FailureForwarder::new(notification.subscription, sink))
            }
            Err(e) => {
                warn!("{}", e);
                sink_error = Some(e);
                None
            }
        },
        _ => None,
    };

    let mut outcome = dispatch(&event, forwarder.as_ref(), &relay).await;
    if let Some(e) = sink_error {
        outcome.forwarded = Some(Err(e));
    }
    if let Some(Ok(true)) = outcome.forwarded {
        println!("{} Forwarded failure notification", WARN);
    }

    if let Ok(relayed) = &outcome.relayed {
        println!("{}", format_relay_outcome(relayed));
    }
    outcome.into_result()?;
    Ok(())
}

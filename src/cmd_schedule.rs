//! `schedule` subcommand.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use autoflow_config::Config;
use autoflow_coordinator::DEFAULT_PIPELINE;
use autoflow_protocols::Goal;
use autoflow_scheduler::{ScheduleSpec, WorkflowTemplate};

use crate::register::Runtime;

pub(crate) struct ScheduleArgs {
    pub goal: String,
    pub interval_ms: Option<u64>,
    pub cron: Option<String>,
    pub at: Option<String>,
    pub runs: usize,
}

pub(crate) async fn handle_schedule(config: &Config, args: ScheduleArgs) -> anyhow::Result<()> {
    let spec = schedule_spec(&args)?;
    let runtime = Runtime::build(config).await?;
    let mut events = runtime.scheduler.subscribe();

    let template = DEFAULT_PIPELINE.iter().fold(
        WorkflowTemplate::new("cli", Goal::new(args.goal.clone())),
        |template, (name, description)| template.with_step(*name, *description),
    );
    let scheduled = runtime.scheduler.schedule(template, spec)?;
    let id = scheduled.definition.id.clone();
    println!(
        "Scheduled {} ({:?}), next fire at {}",
        id,
        scheduled.definition.kind,
        scheduled
            .definition
            .next_fire_at
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    );

    let mut fired = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping scheduler");
                break;
            }
            event = events.recv() => match event {
                Ok(event) if event.schedule_id == id => {
                    fired += 1;
                    let outcome = if event.is_success() { "ok" } else { "failed" };
                    println!(
                        "[{}] fire #{} workflow {} {}",
                        event.fired_at.to_rfc3339(),
                        fired,
                        event.workflow_id,
                        outcome
                    );
                    if let Some(error) = &event.error {
                        println!("  error: {}", error);
                    }
                    if args.runs > 0 && fired >= args.runs {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Schedule event receiver lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    if let Some(scheduled) = runtime.scheduler.get(&id) {
        let definition = &scheduled.definition;
        println!("Final state: {} after {} fires", definition.status, definition.fire_count);
    }
    runtime.shutdown();
    Ok(())
}

fn schedule_spec(args: &ScheduleArgs) -> anyhow::Result<ScheduleSpec> {
    if let Some(interval_ms) = args.interval_ms {
        return Ok(ScheduleSpec::interval(interval_ms));
    }
    if let Some(expr) = &args.cron {
        return Ok(ScheduleSpec::cron(expr.clone()));
    }
    let execute_at = match &args.at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .map_err(|e| anyhow::anyhow!("invalid --at timestamp {}: {}", at, e))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    Ok(ScheduleSpec::once(execute_at))
}

//! `run` subcommand.

use autoflow_config::Config;
use autoflow_coordinator::{DEFAULT_PIPELINE, OrchestrationResult};
use autoflow_engine::WorkflowStep;
use autoflow_protocols::Goal;

use crate::register::Runtime;

pub(crate) async fn handle_run(
    config: &Config,
    goal: String,
    steps: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let runtime = Runtime::build(config).await?;
    let goal = Goal::new(goal);

    let result = if steps.is_empty() {
        runtime.coordinator.run(goal).await?
    } else {
        runtime
            .coordinator
            .run_with_steps(goal, workflow_steps(&steps))
            .await?
    };
    runtime.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if !result.summary.overall_success {
        anyhow::bail!("workflow {} did not complete", result.workflow.id);
    }
    Ok(())
}

/// Steps named on the command line, described from the default pipeline
/// where the name is known.
fn workflow_steps(names: &[String]) -> Vec<WorkflowStep> {
    names
        .iter()
        .map(|name| {
            let description = DEFAULT_PIPELINE
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .map_or(name.as_str(), |(_, d)| *d);
            WorkflowStep::new(name.clone(), description)
        })
        .collect()
}

fn print_summary(result: &OrchestrationResult) {
    let summary = &result.summary;
    println!("Workflow {} ({})", result.workflow.id, result.execution.status);
    println!("{}", "-".repeat(60));
    for step in &result.execution.steps {
        let status = serde_json::to_value(step.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!("{:<24} {:<10} {:>8} ms", step.step_name, status, step.duration_ms);
    }
    println!("{}", "-".repeat(60));
    println!("Success rate:        {:.1}%", summary.success_rate * 100.0);
    println!("Resource efficiency: {:.2}", summary.resource_efficiency);
    println!("Stability:           {:.2}", summary.stability_score);
    println!("Health:              {}", summary.health);
    println!("Duration:            {} ms", summary.duration_ms);

    for error in &result.execution.errors {
        println!("  error: {}", error);
    }
    for recommendation in &result.recommendations {
        println!(
            "  [{:?}] {}: {}",
            recommendation.priority, recommendation.title, recommendation.description
        );
    }
    println!("Report: {}", result.report_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_steps_use_pipeline_descriptions() {
        let steps = workflow_steps(&["testing".to_string(), "lint".to_string()]);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "testing");
        assert_ne!(steps[0].description, "testing");
        assert_eq!(steps[1].description, "lint");
    }
}

//! Default development pipeline.

use autoflow_engine::WorkflowStep;

/// Step names and descriptions of the default pipeline, in order.
pub const DEFAULT_PIPELINE: [(&str, &str); 8] = [
    ("goal-analysis", "Analyze the goal and draw up a plan"),
    ("project-generation", "Generate the project structure and code"),
    ("testing", "Run the automated tests"),
    ("optimization", "Optimize code and performance"),
    ("ux-analysis", "Analyze and improve the UI/UX"),
    ("feedback-processing", "Collect and process feedback"),
    ("bug-tracking", "Detect and fix bugs"),
    ("final-validation", "Final validation and release preparation"),
];

pub fn default_steps() -> Vec<WorkflowStep> {
    DEFAULT_PIPELINE
        .iter()
        .map(|(name, description)| WorkflowStep::new(*name, *description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_config::EngineConfig;

    #[test]
    fn test_default_steps_order() {
        let steps = default_steps();
        assert_eq!(steps.len(), 8);
        assert_eq!(steps[0].name, "goal-analysis");
        assert_eq!(steps[7].name, "final-validation");
    }

    #[test]
    fn test_critical_steps_are_in_pipeline() {
        let names: Vec<&str> = DEFAULT_PIPELINE.iter().map(|(n, _)| *n).collect();
        for critical in EngineConfig::default().critical_steps {
            assert!(names.contains(&critical.as_str()), "{} missing", critical);
        }
    }
}

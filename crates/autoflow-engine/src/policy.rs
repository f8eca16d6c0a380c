//! Critical-step policy.

use std::collections::HashSet;

use autoflow_config::EngineConfig;

/// Names of steps whose failure aborts the remaining steps.
#[derive(Debug, Clone, Default)]
pub struct CriticalStepPolicy {
    names: HashSet<String>,
}

impl CriticalStepPolicy {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.critical_steps.iter().cloned())
    }

    pub fn is_critical(&self, step_name: &str) -> bool {
        self.names.contains(step_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_policy() {
        let policy = CriticalStepPolicy::from_config(&EngineConfig::default());
        assert!(policy.is_critical("goal-analysis"));
        assert!(policy.is_critical("project-generation"));
        assert!(policy.is_critical("final-validation"));
        assert!(!policy.is_critical("testing"));
    }

    #[test]
    fn test_empty_policy() {
        let policy = CriticalStepPolicy::default();
        assert!(!policy.is_critical("goal-analysis"));
    }
}

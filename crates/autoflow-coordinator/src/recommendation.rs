//! Improvement recommendations derived from an analysis.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Execution,
    Performance,
    Quality,
}

/// Used for priority, impact and effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub impact: Priority,
    pub effort: Priority,
    pub timeline: String,
    pub actions: Vec<String>,
    pub expected_outcome: String,
}

impl Recommendation {
    #[allow(clippy::too_many_arguments)]
    fn new(
        kind: RecommendationKind,
        priority: Priority,
        title: &str,
        description: &str,
        impact: Priority,
        effort: Priority,
        timeline: &str,
        actions: &[&str],
        expected_outcome: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            priority,
            title: title.to_string(),
            description: description.to_string(),
            impact,
            effort,
            timeline: timeline.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
            expected_outcome: expected_outcome.to_string(),
        }
    }
}

/// Zero to three recommendations: success rate below 0.8, resource
/// efficiency below 0.7, stability below 0.8.
pub fn recommend(analysis: &AnalysisResult) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if analysis.execution.success_rate < 0.8 {
        recommendations.push(Recommendation::new(
            RecommendationKind::Execution,
            Priority::High,
            "Improve workflow success rate",
            "Too many workflow steps fail. Analyze the failures and address their causes.",
            Priority::High,
            Priority::Medium,
            "2-4 weeks",
            &[
                "Analyze the failed steps",
                "Improve error handling",
                "Add retry logic",
                "Strengthen dependency checks",
            ],
            "95% execution success rate",
        ));
    }

    if analysis.performance.resource_efficiency < 0.7 {
        recommendations.push(Recommendation::new(
            RecommendationKind::Performance,
            Priority::Medium,
            "Improve resource efficiency",
            "Resource usage is high for the work done. Optimize to recover headroom.",
            Priority::Medium,
            Priority::High,
            "4-6 weeks",
            &[
                "Reduce memory usage",
                "Reduce CPU usage",
                "Introduce parallel processing",
                "Improve the caching strategy",
            ],
            "30% better resource efficiency",
        ));
    }

    if analysis.quality.stability_score < 0.8 {
        recommendations.push(Recommendation::new(
            RecommendationKind::Quality,
            Priority::High,
            "Improve system stability",
            "Stability is low. Strengthen error handling and monitoring.",
            Priority::High,
            Priority::Medium,
            "3-5 weeks",
            &[
                "Improve error handling",
                "Extend monitoring",
                "Tune alerting",
                "Strengthen logging",
            ],
            "90% stability score",
        ));
    }

    recommendations
}

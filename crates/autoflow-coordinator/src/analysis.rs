//! Post-run analysis.
//!
//! Three scores feed the health rating, each in `[0, 1]`:
//! - success rate: completed steps over total steps
//! - resource efficiency: mean of `1 - memory/reference` and `1 - cpu/reference`
//! - stability: `1 - 0.5*errorRate - 0.1*warningRate - 0.2*alertRate`, rates per step

use serde::{Deserialize, Serialize};

use autoflow_config::CoordinatorConfig;
use autoflow_engine::WorkflowExecutionResult;
use autoflow_monitor::ResourceAggregates;

const LONG_EXECUTION_MS: u64 = 5 * 60 * 1000;
const HIGH_MEMORY_MB: f64 = 500.0;
const HIGH_CPU_PERCENT: f64 = 80.0;

/// Resource usage attributed to one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl ResourceSnapshot {
    /// Prefer the monitor's sample averages; a run that ended before the
    /// first sampling tick falls back to the engine's per-step samples.
    pub fn from_sources(aggregates: Option<&ResourceAggregates>, result: &WorkflowExecutionResult) -> Self {
        if let Some(agg) = aggregates.filter(|a| a.sample_count > 0) {
            return Self {
                memory_mb: agg.average_memory_mb,
                cpu_percent: agg.average_cpu_percent,
            };
        }

        let samples: Vec<_> = result.steps.iter().filter_map(|s| s.resource_sample).collect();
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        Self {
            memory_mb: samples.iter().map(|s| s.memory_mb).sum::<f64>() / n,
            cpu_percent: samples.iter().map(|s| s.cpu_percent).sum::<f64>() / n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    LongExecution,
    HighMemoryUsage,
    HighCpuUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    /// Bucket the mean of the three scores.
    pub fn from_scores(success_rate: f64, resource_efficiency: f64, stability: f64) -> Self {
        let overall = (success_rate + resource_efficiency + stability) / 3.0;
        if overall >= 0.9 {
            HealthStatus::Excellent
        } else if overall >= 0.7 {
            HealthStatus::Good
        } else if overall >= 0.5 {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAnalysis {
    pub success: bool,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub success_rate: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    pub average_step_ms: f64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub resource_efficiency: f64,
    pub bottlenecks: Vec<Bottleneck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAnalysis {
    pub error_rate: f64,
    pub warning_count: usize,
    pub alert_count: usize,
    pub stability_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub execution: ExecutionAnalysis,
    pub performance: PerformanceAnalysis,
    pub quality: QualityAnalysis,
    /// Short remediation hints; the full records come from [`crate::recommend`].
    pub recommendations: Vec<String>,
    pub insights: Vec<String>,
}

impl AnalysisResult {
    pub fn health(&self) -> HealthStatus {
        HealthStatus::from_scores(
            self.execution.success_rate,
            self.performance.resource_efficiency,
            self.quality.stability_score,
        )
    }
}

/// Turns a run's engine result and monitor output into an [`AnalysisResult`].
#[derive(Debug, Clone)]
pub struct Analyzer {
    memory_reference_mb: f64,
    cpu_reference_percent: f64,
}

impl Analyzer {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            memory_reference_mb: config.memory_reference_mb,
            cpu_reference_percent: config.cpu_reference_percent,
        }
    }

    pub fn resource_efficiency(&self, resources: &ResourceSnapshot) -> f64 {
        let memory = (1.0 - resources.memory_mb / self.memory_reference_mb).clamp(0.0, 1.0);
        let cpu = (1.0 - resources.cpu_percent / self.cpu_reference_percent).clamp(0.0, 1.0);
        (memory + cpu) / 2.0
    }

    pub fn analyze(
        &self,
        result: &WorkflowExecutionResult,
        resources: &ResourceSnapshot,
        alert_count: usize,
    ) -> AnalysisResult {
        let metrics = &result.metrics;
        let per_step = |count: usize| {
            if metrics.total_steps == 0 {
                0.0
            } else {
                count as f64 / metrics.total_steps as f64
            }
        };

        let error_rate = per_step(metrics.failed_steps);
        let warning_count = result.warnings.len();
        let stability_score = (1.0
            - 0.5 * error_rate
            - 0.1 * per_step(warning_count)
            - 0.2 * per_step(alert_count))
        .clamp(0.0, 1.0);

        let mut bottlenecks = Vec::new();
        if metrics.duration_ms > LONG_EXECUTION_MS {
            bottlenecks.push(Bottleneck::LongExecution);
        }
        if resources.memory_mb > HIGH_MEMORY_MB {
            bottlenecks.push(Bottleneck::HighMemoryUsage);
        }
        if resources.cpu_percent > HIGH_CPU_PERCENT {
            bottlenecks.push(Bottleneck::HighCpuUsage);
        }

        let mut analysis = AnalysisResult {
            execution: ExecutionAnalysis {
                success: result.is_success(),
                total_steps: metrics.total_steps,
                completed_steps: metrics.completed_steps,
                failed_steps: metrics.failed_steps,
                success_rate: metrics.success_rate,
                duration_ms: metrics.duration_ms,
            },
            performance: PerformanceAnalysis {
                average_step_ms: if metrics.total_steps == 0 {
                    0.0
                } else {
                    metrics.duration_ms as f64 / metrics.total_steps as f64
                },
                memory_mb: resources.memory_mb,
                cpu_percent: resources.cpu_percent,
                resource_efficiency: self.resource_efficiency(resources),
                bottlenecks,
            },
            quality: QualityAnalysis {
                error_rate,
                warning_count,
                alert_count,
                stability_score,
            },
            recommendations: Vec::new(),
            insights: Vec::new(),
        };

        analysis.recommendations = hints(&analysis);
        analysis.insights = insights(&analysis);
        analysis
    }
}

fn hints(analysis: &AnalysisResult) -> Vec<String> {
    let mut hints = Vec::new();
    if analysis.execution.success_rate < 0.8 {
        hints.push("Improve the workflow success rate.".to_string());
    }
    if analysis.performance.resource_efficiency < 0.7 {
        hints.push("Improve resource efficiency.".to_string());
    }
    if analysis.quality.stability_score < 0.8 {
        hints.push("Improve system stability.".to_string());
    }
    hints
}

fn insights(analysis: &AnalysisResult) -> Vec<String> {
    let mut insights = Vec::new();
    if analysis.execution.success_rate > 0.9 {
        insights.push("Workflow execution is highly reliable.".to_string());
    }
    if analysis.performance.resource_efficiency > 0.8 {
        insights.push("Resources are used efficiently.".to_string());
    }
    if analysis.quality.stability_score > 0.9 {
        insights.push("The system is very stable.".to_string());
    }
    insights
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod tests;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dora::DoraMetrics;
use crate::providers::azure::types::PipelineDefinition;
use crate::time::TimeWindow;

/// Everything collected for one application over one window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoraInsights {
    pub provider: String,
    pub app: String,
    pub organization: String,
    pub project: String,
    pub pipelines: Vec<PipelineDefinition>,
    pub branch: Option<String>,
    pub window: TimeWindow,
    pub collected_at: DateTime<Utc>,
    pub total_builds: usize,
    #[serde(flatten)]
    pub metrics: DoraMetrics,
}

impl DoraInsights {
    /// Pipeline names as a comma separated list, falling back to ids.
    pub fn pipeline_label(&self) -> String {
        self.pipelines
            .iter()
            .map(|p| {
                if p.name.trim().is_empty() {
                    p.id.to_string()
                } else {
                    p.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

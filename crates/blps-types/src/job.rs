// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of BLPS.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use crate::lenient;
use crate::results::OptimizationResults;
use crate::settings::OptimizationSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a backend optimization job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Processing,
    Completed,
    Failed,
    /// Any state string this dashboard does not know about
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Completed and failed jobs never change again
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of a user's job history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(default, deserialize_with = "lenient::string")]
    pub job_id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "lenient::number")]
    pub progress_percent: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub created_at: Option<String>,
}

impl JobSummary {
    /// First eight characters of the job id followed by an ellipsis
    #[must_use]
    pub fn short_id(&self) -> String {
        short_job_id(&self.job_id)
    }

    /// Progress clamped into [0, 100]
    #[must_use]
    pub fn progress(&self) -> f64 {
        clamp_progress(self.progress_percent)
    }
}

/// Full status of one job, including results once it has completed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    #[serde(default, deserialize_with = "lenient::string")]
    pub job_id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "lenient::number")]
    pub progress_percent: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub company_name: Option<String>,
    /// `None` while the job is still running or produced nothing
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub results: Option<OptimizationResults>,
    /// Echo of the settings the job was submitted with
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub settings: Option<OptimizationSettings>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub error: Option<String>,
}

impl JobStatusResponse {
    #[must_use]
    pub fn progress(&self) -> f64 {
        clamp_progress(self.progress_percent)
    }
}

/// Backend acknowledgement of a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionAck {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub job_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn short_job_id(job_id: &str) -> String {
    let prefix: String = job_id.chars().take(8).collect();
    format!("{prefix}...")
}

fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_status_string() {
        let summary: JobSummary = serde_json::from_value(json!({
            "job_id": "abc",
            "status": "queued"
        }))
        .unwrap();
        assert_eq!(summary.status, JobStatus::Unknown);
    }

    #[test]
    fn test_short_id_truncates_to_eight_chars() {
        let summary = JobSummary {
            job_id: "0123456789abcdef".to_owned(),
            ..Default::default()
        };
        assert_eq!(summary.short_id(), "01234567...");
    }

    #[test]
    fn test_null_results_stay_pending() {
        let status: JobStatusResponse = serde_json::from_value(json!({
            "job_id": "j1",
            "status": "processing",
            "progress_percent": 40,
            "results": null
        }))
        .unwrap();
        assert!(status.results.is_none());
        assert!(!status.status.is_terminal());
    }

    #[test]
    fn test_progress_is_clamped() {
        let status: JobStatusResponse =
            serde_json::from_value(json!({"job_id": "j1", "progress_percent": 140})).unwrap();
        assert!((status.progress() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ack_keeps_unknown_fields() {
        let ack: SubmissionAck =
            serde_json::from_value(json!({"job_id": "j9", "queued_at": "now"})).unwrap();
        assert_eq!(ack.job_id.as_deref(), Some("j9"));
        assert_eq!(ack.extra.get("queued_at"), Some(&json!("now")));
    }
}

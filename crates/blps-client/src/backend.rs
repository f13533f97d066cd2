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

use crate::client::{Caller, OptimizationClient, UploadFile};
use crate::errors::RelayResult;
use async_trait::async_trait;
use blps_types::{JobStatusResponse, JobSummary, SubmissionAck};
use tracing::warn;

/// Optimization backend as seen by the web layer.
/// Pages depend on this trait, never on the HTTP details.
#[async_trait]
pub trait OptimizationBackend: Send + Sync + std::fmt::Debug {
    /// Forward a settings document and usage file for optimization
    async fn submit(
        &self,
        caller: &Caller,
        settings_json: String,
        file: Option<UploadFile>,
    ) -> RelayResult<SubmissionAck>;

    /// Jobs submitted by the caller
    async fn history(&self, caller: &Caller) -> RelayResult<Vec<JobSummary>>;

    /// Status and results of one job
    async fn status(&self, caller: &Caller, job_id: &str) -> RelayResult<JobStatusResponse>;

    /// History for display; failures show as an empty list
    async fn history_or_empty(&self, caller: &Caller) -> Vec<JobSummary> {
        match self.history(caller).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("⚠️ Failed to load job history for {}: {}", caller.user_id, e);
                Vec::new()
            }
        }
    }

    /// Status for display; failures show as a missing job
    async fn status_or_none(&self, caller: &Caller, job_id: &str) -> Option<JobStatusResponse> {
        match self.status(caller, job_id).await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("⚠️ Failed to load status of job {}: {}", job_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl OptimizationBackend for OptimizationClient {
    async fn submit(
        &self,
        caller: &Caller,
        settings_json: String,
        file: Option<UploadFile>,
    ) -> RelayResult<SubmissionAck> {
        OptimizationClient::submit(self, caller, settings_json, file).await
    }

    async fn history(&self, caller: &Caller) -> RelayResult<Vec<JobSummary>> {
        OptimizationClient::history(self, caller).await
    }

    async fn status(&self, caller: &Caller, job_id: &str) -> RelayResult<JobStatusResponse> {
        OptimizationClient::status(self, caller, job_id).await
    }
}

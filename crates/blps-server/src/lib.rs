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

//! BLPS dashboard server: configuration and application wiring.

pub mod config;

use anyhow::{Context, Result};
use blps_client::OptimizationClient;
use blps_i18n::Catalog;
use blps_web::{ActivityStore, AppState, SessionService, WebConfig};
use config::ServerConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build handler state from validated configuration
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let client = OptimizationClient::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_secs),
    )
    .context("Failed to create backend client")?;
    info!(base_url = %config.backend.base_url, "Backend client ready");

    let catalog = Catalog::load().context("Failed to load translations")?;

    let activity = match &config.activity.database_path {
        Some(path) => {
            let store = ActivityStore::open(path)?;
            info!(path = %path.display(), "Account database opened");
            Some(Arc::new(store))
        }
        None => None,
    };

    Ok(AppState {
        backend: Arc::new(client),
        catalog,
        sessions: Arc::new(SessionService::new(
            &config.auth.session_secret,
            config.auth.session_ttl_hours,
        )),
        activity,
        config: Arc::new(WebConfig {
            default_locale: config.locale()?,
            display_timezone: config.timezone()?,
            sign_in_path: config.auth.sign_in_path.clone(),
            activity_limit: config.activity.limit,
            max_upload_bytes: config.server.max_upload_bytes,
        }),
    })
}

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

use anyhow::{Context, Result, anyhow, bail};
use blps_i18n::Language;
use blps_web::is_absolute_url;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const PLACEHOLDER_SECRET: &str = "change-me-to-a-strong-random-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub i18n: I18nSettings,
    #[serde(default)]
    pub activity: ActivitySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 key shared with the account service that issues session cookies
    pub session_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct I18nSettings {
    #[serde(default = "default_locale")]
    pub default_locale: String,
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySettings {
    /// Account database; without it the activity page is empty
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_activity_limit")]
    pub limit: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_session_ttl_hours() -> u32 {
    24
}

fn default_sign_in_path() -> String {
    "/sign-in".to_owned()
}

fn default_locale() -> String {
    "en".to_owned()
}

fn default_display_timezone() -> String {
    "Asia/Taipei".to_owned()
}

fn default_activity_limit() -> usize {
    20
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for I18nSettings {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
            display_timezone: default_display_timezone(),
        }
    }
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            database_path: None,
            limit: default_activity_limit(),
        }
    }
}

impl ServerConfig {
    /// Load, apply environment overrides and validate
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config TOML")
    }

    /// `BACKEND_BASE_URL` and `AUTH_SECRET` win over the file
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("BACKEND_BASE_URL").filter(|v| !v.is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(secret) = lookup("AUTH_SECRET").filter(|v| !v.is_empty()) {
            self.auth.session_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.session_secret.is_empty() || self.auth.session_secret == PLACEHOLDER_SECRET {
            bail!("auth.session_secret must be set to a strong random value");
        }
        if self.auth.session_ttl_hours == 0 {
            bail!("auth.session_ttl_hours must be at least 1");
        }
        let sign_in = &self.auth.sign_in_path;
        if !sign_in.starts_with('/') && !is_absolute_url(sign_in) {
            bail!("auth.sign_in_path must start with '/' or be an http(s) URL");
        }
        if self.backend.base_url.trim().is_empty() {
            bail!("backend.base_url must be set");
        }
        if self.backend.timeout_secs == 0 {
            bail!("backend.timeout_secs must be at least 1");
        }
        self.locale()?;
        self.timezone()?;
        Ok(())
    }

    pub fn locale(&self) -> Result<Language> {
        Language::from_code(&self.i18n.default_locale)
            .with_context(|| format!("Invalid i18n.default_locale: {}", self.i18n.default_locale))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.i18n.display_timezone.parse::<Tz>().map_err(|e| {
            anyhow!(
                "Invalid i18n.display_timezone {}: {}",
                self.i18n.display_timezone,
                e
            )
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

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

//! Read access to the account database's activity log.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::params;
use std::path::Path;

#[derive(Debug)]
pub struct ActivityStore {
    conn: Mutex<rusqlite::Connection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: i64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
}

impl ActivityStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = rusqlite::Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS activity_logs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER,
                action      TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                ip_address  TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_activity_user_time
                ON activity_logs(user_id, timestamp DESC);",
        )
        .context("Failed to initialize activity schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Newest entries of one user, at most `limit`
    pub fn recent_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, action, timestamp, ip_address
             FROM activity_logs WHERE user_id = ?1
             ORDER BY timestamp DESC LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    timestamp: row.get(2)?,
                    ip_address: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn record(
        &self,
        user_id: i64,
        action: &str,
        timestamp: DateTime<Utc>,
        ip_address: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO activity_logs (user_id, action, timestamp, ip_address) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, action, timestamp.to_rfc3339(), ip_address],
        )?;
        Ok(())
    }
}

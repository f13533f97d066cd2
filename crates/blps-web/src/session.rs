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

//! Signed `session` cookie shared with the account service.
//!
//! Tokens are HS256 JWTs carrying `{user: {id}, expires}` plus the standard
//! `exp` claim. Claims this dashboard does not know are carried through a
//! refresh untouched.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use blps_client::Caller;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Session expired or carries an unreadable expiry")]
    InvalidExpiry,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Account id as issued by the account service (numeric there, but not guaranteed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl UserId {
    /// Numeric form, used as the activity log key
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(id) => Some(*id),
            Self::Text(id) => id.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: SessionUser,
    /// RFC 3339 expiry, millisecond precision
    pub expires: String,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A verified session for the current request
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: SessionClaims,
    pub token: String,
}

impl Session {
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.claims.user.id
    }

    /// Identity forwarded to the optimization backend
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id().to_string()).with_token(self.token.clone())
    }
}

/// Issues, verifies and refreshes session tokens
pub struct SessionService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("ttl", &self.ttl)
            .field("keys", &"<redacted>")
            .finish()
    }
}

impl SessionService {
    #[must_use]
    pub fn new(secret: &str, ttl_hours: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: TimeDelta::hours(i64::from(ttl_hours)),
        }
    }

    /// Sign a fresh session for `user`
    pub fn issue(&self, user: UserId) -> SessionResult<String> {
        let claims = SessionClaims {
            user: SessionUser { id: user },
            expires: String::new(),
            exp: 0,
            extra: Map::new(),
        };
        self.refresh(&claims)
    }

    /// Check signature, algorithm and both expiry claims
    pub fn verify(&self, token: &str) -> SessionResult<Session> {
        let claims = decode::<SessionClaims>(token, &self.decoding, &self.validation)?.claims;

        let expires = DateTime::parse_from_rfc3339(&claims.expires)
            .map_err(|_| SessionError::InvalidExpiry)?;
        if expires.with_timezone(&Utc) <= Utc::now() {
            return Err(SessionError::InvalidExpiry);
        }

        Ok(Session {
            claims,
            token: token.to_owned(),
        })
    }

    /// Re-sign `claims` with an expiry one TTL from now
    pub fn refresh(&self, claims: &SessionClaims) -> SessionResult<String> {
        let expires = Utc::now() + self.ttl;
        let mut claims = claims.clone();
        claims.expires = expires.to_rfc3339_opts(SecondsFormat::Millis, true);
        claims.exp = expires.timestamp();
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// `Set-Cookie` value carrying `token`
    #[must_use]
    pub fn session_cookie(&self, token: String) -> String {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(cookie::time::Duration::seconds(self.ttl.num_seconds()))
            .build()
            .to_string()
    }

    /// `Set-Cookie` value that deletes the session cookie
    #[must_use]
    pub fn removal_cookie(&self) -> String {
        let mut cookie = Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .path("/")
            .build();
        cookie.make_removal();
        cookie.to_string()
    }
}

/// Raw `session` cookie value from the request, if any
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

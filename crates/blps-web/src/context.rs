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

//! Per-request locale and session resolution.
//!
//! Every page handler receives a [`RequestContext`] through request
//! extensions. Nothing is cached between requests.

use crate::AppState;
use crate::session::{Session, token_from_headers};
use axum::extract::{Request, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use blps_client::Caller;
use blps_i18n::{FluentArgs, I18n, Language};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Paths served without a locale segment
const LOCALE_EXEMPT: [&str; 3] = ["/health", "/api", "/static"];

/// First path segments (after the locale) that require a session
const PROTECTED: [&str; 2] = ["dashboard", "evaluation"];

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub locale: Language,
    pub i18n: Arc<I18n>,
    pub session: Option<Session>,
    /// Request path with the locale segment removed, `/` at minimum
    pub path: String,
}

/// Entry of the language switcher
#[derive(Debug, Clone)]
pub struct LanguageLink {
    pub href: String,
    pub label: &'static str,
    pub active: bool,
}

impl RequestContext {
    pub fn t(&self, key: &str) -> String {
        self.i18n.text(key)
    }

    /// Message with a `$count` argument, for plural selectors
    pub fn t_count(&self, key: &str, count: i64) -> String {
        let mut args = FluentArgs::new();
        args.set("count", count);
        self.format(key, &args)
    }

    pub fn t_with(&self, key: &str, name: &str, value: &str) -> String {
        let mut args = FluentArgs::new();
        args.set(name.to_owned(), value.to_owned());
        self.format(key, &args)
    }

    fn format(&self, key: &str, args: &FluentArgs<'_>) -> String {
        self.i18n.format(key, Some(args)).unwrap_or_else(|e| {
            debug!("Translation fallback for {}: {}", key, e);
            key.to_owned()
        })
    }

    /// `path` under the current locale
    pub fn href(&self, path: &str) -> String {
        localized_path(self.locale, path)
    }

    pub fn lang(&self) -> &'static str {
        self.locale.code()
    }

    /// The current page in every supported language
    pub fn language_links(&self) -> Vec<LanguageLink> {
        Language::ALL
            .iter()
            .map(|&language| LanguageLink {
                href: localized_path(language, &self.path),
                label: language.display_name(),
                active: language == self.locale,
            })
            .collect()
    }

    pub fn signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn caller(&self) -> Option<Caller> {
        self.session.as_ref().map(Session::caller)
    }
}

/// `/en` for the root, `/en/evaluation` for `/evaluation`
#[must_use]
pub fn localized_path(language: Language, path: &str) -> String {
    if path.is_empty() || path == "/" {
        format!("/{}", language.code())
    } else if path.starts_with('/') {
        format!("/{}{path}", language.code())
    } else {
        format!("/{}/{path}", language.code())
    }
}

/// Where unauthenticated page requests go. Absolute URLs point at the
/// account service and are used as given; paths get the locale prefix.
#[must_use]
pub fn sign_in_target(language: Language, sign_in: &str) -> String {
    if is_absolute_url(sign_in) {
        sign_in.to_owned()
    } else {
        localized_path(language, sign_in)
    }
}

#[must_use]
pub fn is_absolute_url(target: &str) -> bool {
    target.starts_with("https://") || target.starts_with("http://")
}

/// Split `/zh-hant/evaluation` into the language and `/evaluation`
#[must_use]
pub fn split_locale(path: &str) -> Option<(Language, String)> {
    let trimmed = path.strip_prefix('/')?;
    let (segment, rest) = match trimmed.find('/') {
        Some(index) => trimmed.split_at(index),
        None => (trimmed, ""),
    };
    let language = Language::ALL
        .into_iter()
        .find(|language| language.code() == segment)?;
    let rest = if rest.is_empty() { "/" } else { rest };
    Some((language, rest.to_owned()))
}

fn is_locale_exempt(path: &str) -> bool {
    LOCALE_EXEMPT
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
}

/// `/dashboard`, `/dashboard/activity` and `/evaluation/...` need a session
#[must_use]
pub fn is_protected(path: &str) -> bool {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .is_some_and(|first| PROTECTED.contains(&first))
}

enum SessionState {
    Missing,
    Valid(Session),
    Invalid,
}

fn resolve_session(state: &AppState, request: &Request) -> SessionState {
    let Some(token) = token_from_headers(request.headers()) else {
        return SessionState::Missing;
    };
    match state.sessions.verify(&token) {
        Ok(session) => SessionState::Valid(session),
        Err(e) => {
            debug!("Rejecting session cookie: {}", e);
            SessionState::Invalid
        }
    }
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => error!("❌ Failed to encode session cookie: {}", e),
    }
    response
}

fn temporary_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, value)]).into_response(),
        Err(_) => Redirect::temporary("/").into_response(),
    }
}

/// Locale redirect, session check and context injection
pub async fn request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    let (locale, rest, is_page) = if is_locale_exempt(&path) {
        if !path.starts_with("/api") {
            return next.run(request).await;
        }
        (state.config.default_locale, path.clone(), false)
    } else {
        match split_locale(&path) {
            Some((locale, rest)) => (locale, rest, true),
            None => {
                let mut target = localized_path(state.config.default_locale, &path);
                if let Some(query) = request.uri().query() {
                    target = format!("{target}?{query}");
                }
                debug!("Redirecting {} to {}", path, target);
                return temporary_redirect(&target);
            }
        }
    };

    let session = resolve_session(&state, &request);
    let had_invalid_cookie = matches!(session, SessionState::Invalid);
    let session = match session {
        SessionState::Valid(session) => Some(session),
        SessionState::Missing | SessionState::Invalid => None,
    };

    if is_page && session.is_none() && is_protected(&rest) {
        let target = sign_in_target(locale, &state.config.sign_in_path);
        debug!("No session for {}, redirecting to {}", path, target);
        let response = temporary_redirect(&target);
        return if had_invalid_cookie {
            with_cookie(response, &state.sessions.removal_cookie())
        } else {
            response
        };
    }

    let i18n = match state.catalog.get(locale) {
        Ok(i18n) => i18n,
        Err(e) => {
            error!("❌ Translations unavailable for {}: {}", locale, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Translations unavailable")
                .into_response();
        }
    };

    let refresh = is_page && request.method() == Method::GET;
    let refreshed_token = match (&session, refresh) {
        (Some(session), true) => match state.sessions.refresh(&session.claims) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("⚠️ Failed to refresh session: {}", e);
                None
            }
        },
        _ => None,
    };

    request.extensions_mut().insert(RequestContext {
        locale,
        i18n,
        session,
        path: rest,
    });

    let response = next.run(request).await;

    if let Some(token) = refreshed_token {
        with_cookie(response, &state.sessions.session_cookie(token))
    } else if had_invalid_cookie {
        with_cookie(response, &state.sessions.removal_cookie())
    } else {
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_locale() {
        assert_eq!(
            split_locale("/zh-hant/evaluation/new"),
            Some((Language::TraditionalChinese, "/evaluation/new".to_owned()))
        );
        assert_eq!(split_locale("/en"), Some((Language::English, "/".to_owned())));
        assert_eq!(split_locale("/en/"), Some((Language::English, "/".to_owned())));
        assert_eq!(split_locale("/english/x"), None);
        assert_eq!(split_locale("/evaluation"), None);
        assert_eq!(split_locale("/"), None);
    }

    #[test]
    fn test_localized_path() {
        assert_eq!(localized_path(Language::English, "/"), "/en");
        assert_eq!(localized_path(Language::English, ""), "/en");
        assert_eq!(
            localized_path(Language::TraditionalChinese, "/evaluation"),
            "/zh-hant/evaluation"
        );
        assert_eq!(localized_path(Language::English, "sign-in"), "/en/sign-in");
    }

    #[test]
    fn test_sign_in_target() {
        assert_eq!(
            sign_in_target(Language::TraditionalChinese, "/sign-in"),
            "/zh-hant/sign-in"
        );
        assert_eq!(
            sign_in_target(Language::English, "https://accounts.example.com/sign-in"),
            "https://accounts.example.com/sign-in"
        );
    }

    #[test]
    fn test_protected_paths_match_whole_segments() {
        assert!(is_protected("/dashboard"));
        assert!(is_protected("/dashboard/activity"));
        assert!(is_protected("/evaluation/result/abc"));
        assert!(!is_protected("/"));
        assert!(!is_protected("/dashboards"));
        assert!(!is_protected("/sign-in"));
    }

    #[test]
    fn test_locale_exempt_paths() {
        assert!(is_locale_exempt("/health"));
        assert!(is_locale_exempt("/api/optimizations"));
        assert!(is_locale_exempt("/static/app.css"));
        assert!(!is_locale_exempt("/apiary"));
        assert!(!is_locale_exempt("/evaluation"));
    }
}

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

use fluent::FluentResource;
use fluent_bundle::concurrent::FluentBundle;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use unic_langid::LanguageIdentifier;

pub use fluent::FluentArgs;

/// Translation domains embedded in the binary, in lookup order
const DOMAINS: [&str; 3] = ["web", "evaluation", "results"];

/// Supported languages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
pub enum Language {
    /// English (default)
    #[default]
    #[serde(rename = "en")]
    English,
    /// Traditional Chinese
    #[serde(rename = "zh-hant")]
    TraditionalChinese,
}

impl Language {
    /// Get the locale code used in URLs (e.g., "en", "zh-hant")
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::TraditionalChinese => "zh-hant",
        }
    }

    /// Get the language display name
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::TraditionalChinese => "繁體中文",
        }
    }

    /// List all supported languages
    pub const ALL: [Language; 2] = [Language::English, Language::TraditionalChinese];

    /// Parse language from a locale code
    ///
    /// # Errors
    ///
    /// Returns `I18nError::UnsupportedLanguage` if the language code is not supported.
    pub fn from_code(code: &str) -> Result<Self, I18nError> {
        match code.to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "zh-hant" | "zh_hant" | "zh-tw" => Ok(Self::TraditionalChinese),
            _ => Err(I18nError::UnsupportedLanguage(code.to_owned())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = I18nError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// Translation errors
#[derive(Debug, Error)]
pub enum I18nError {
    /// Translation key not found
    #[error("Translation key not found: {0}")]
    KeyNotFound(String),

    /// Failed to load translation resource
    #[error("Failed to load translation resource: {0}")]
    LoadError(String),

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Formatting error
    #[error("Failed to format translation: {0}")]
    FormatError(String),
}

/// Translations for one language, shared across request handlers
pub struct I18n {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
    language: Language,
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("language", &self.language)
            .field("bundles", &"<FluentBundle>")
            .finish()
    }
}

impl I18n {
    /// Create a new i18n instance for the specified language
    ///
    /// # Errors
    ///
    /// Returns `I18nError::LoadError` if translation files cannot be loaded.
    pub fn new(language: Language) -> Result<Self, I18nError> {
        let mut i18n = Self {
            bundles: HashMap::new(),
            language,
        };

        for domain in DOMAINS {
            i18n.load_domain(domain)?;
        }

        Ok(i18n)
    }

    fn load_domain(&mut self, domain: &'static str) -> Result<(), I18nError> {
        let lang_code = self.language.code();
        let ftl_content = Self::load_ftl_file(lang_code, domain)?;

        let resource = FluentResource::try_new(ftl_content.to_owned())
            .map_err(|e| I18nError::LoadError(format!("Failed to parse {domain}.ftl: {e:?}")))?;

        let lang_id: LanguageIdentifier = lang_code
            .parse()
            .map_err(|e| I18nError::LoadError(format!("Invalid language ID: {e}")))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        // Output goes straight into HTML, so no bidi isolation marks around placeables
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|e| I18nError::LoadError(format!("Failed to add resource: {e:?}")))?;

        self.bundles.insert(domain, bundle);
        Ok(())
    }

    fn load_ftl_file(lang_code: &str, domain: &str) -> Result<&'static str, I18nError> {
        match (lang_code, domain) {
            ("en", "web") => Ok(include_str!("../locales/en/web.ftl")),
            ("en", "evaluation") => Ok(include_str!("../locales/en/evaluation.ftl")),
            ("en", "results") => Ok(include_str!("../locales/en/results.ftl")),
            ("zh-hant", "web") => Ok(include_str!("../locales/zh-hant/web.ftl")),
            ("zh-hant", "evaluation") => Ok(include_str!("../locales/zh-hant/evaluation.ftl")),
            ("zh-hant", "results") => Ok(include_str!("../locales/zh-hant/results.ftl")),
            _ => Err(I18nError::LoadError(format!(
                "Translation file not found: {lang_code}/{domain}.ftl"
            ))),
        }
    }

    /// Get a translated string by key
    ///
    /// # Errors
    ///
    /// Returns `I18nError::KeyNotFound` if the translation key is not found in any domain.
    pub fn get(&self, key: &str) -> Result<String, I18nError> {
        self.format(key, None)
    }

    /// Format a translated string with arguments
    ///
    /// # Errors
    ///
    /// Returns `I18nError::KeyNotFound` if the translation key is not found.
    /// Returns `I18nError::FormatError` if formatting fails.
    pub fn format(&self, key: &str, args: Option<&FluentArgs<'_>>) -> Result<String, I18nError> {
        for domain in DOMAINS {
            let Some(bundle) = self.bundles.get(domain) else {
                continue;
            };
            if let Some(message) = bundle.get_message(key).and_then(|msg| msg.value()) {
                let mut errors = vec![];
                let value = bundle.format_pattern(message, args, &mut errors);

                if !errors.is_empty() {
                    return Err(I18nError::FormatError(format!(
                        "Formatting errors: {errors:?}"
                    )));
                }

                return Ok(value.into_owned());
            }
        }

        Err(I18nError::KeyNotFound(key.to_owned()))
    }

    /// Translate `key`, or return the key itself when it is missing
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_else(|_| key.to_owned())
    }

    /// Whether any domain defines `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.bundles.values().any(|bundle| bundle.has_message(key))
    }

    /// Get the current language
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }
}

/// Loaded translations for every supported language
#[derive(Debug, Clone)]
pub struct Catalog {
    languages: Arc<HashMap<Language, Arc<I18n>>>,
}

impl Catalog {
    /// Load all supported languages
    ///
    /// # Errors
    ///
    /// Returns `I18nError` if any language fails to load.
    pub fn load() -> Result<Self, I18nError> {
        let mut languages = HashMap::new();
        for language in Language::ALL {
            languages.insert(language, Arc::new(I18n::new(language)?));
        }
        Ok(Self {
            languages: Arc::new(languages),
        })
    }

    /// Translations for `language`
    ///
    /// # Errors
    ///
    /// Returns `I18nError::UnsupportedLanguage` if the language was not loaded.
    pub fn get(&self, language: Language) -> Result<Arc<I18n>, I18nError> {
        self.languages
            .get(&language)
            .cloned()
            .ok_or_else(|| I18nError::UnsupportedLanguage(language.code().to_owned()))
    }
}

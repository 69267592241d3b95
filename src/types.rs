//! Core data types shared across the library
//!
//! Defines the closed set of service languages, the in-memory translation
//! map shapes, and the wire request/response envelopes for the four API
//! operations. Every response envelope carries the same `{ok, data?,
//! error?, message?}` structure the service returns.

use crate::error::I18nError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Languages the translation service can serve
///
/// The wire form is the lowercase two-letter service code (note: the
/// service uses `cn` for Chinese, not the ISO `zh`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Fr,
    En,
    Nl,
    It,
    De,
    Es,
    Pl,
    Pt,
    Ro,
    Hu,
    Sv,
    Tr,
    Ja,
    Cn,
    Ru,
    Ko,
    Ar,
}

impl Lang {
    /// Every language the service knows about
    pub const ALL: [Lang; 17] = [
        Lang::Fr,
        Lang::En,
        Lang::Nl,
        Lang::It,
        Lang::De,
        Lang::Es,
        Lang::Pl,
        Lang::Pt,
        Lang::Ro,
        Lang::Hu,
        Lang::Sv,
        Lang::Tr,
        Lang::Ja,
        Lang::Cn,
        Lang::Ru,
        Lang::Ko,
        Lang::Ar,
    ];

    /// The two-letter service code for this language
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Fr => "fr",
            Lang::En => "en",
            Lang::Nl => "nl",
            Lang::It => "it",
            Lang::De => "de",
            Lang::Es => "es",
            Lang::Pl => "pl",
            Lang::Pt => "pt",
            Lang::Ro => "ro",
            Lang::Hu => "hu",
            Lang::Sv => "sv",
            Lang::Tr => "tr",
            Lang::Ja => "ja",
            Lang::Cn => "cn",
            Lang::Ru => "ru",
            Lang::Ko => "ko",
            Lang::Ar => "ar",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Lang {
    type Err = I18nError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" => Ok(Lang::Fr),
            "en" => Ok(Lang::En),
            "nl" => Ok(Lang::Nl),
            "it" => Ok(Lang::It),
            "de" => Ok(Lang::De),
            "es" => Ok(Lang::Es),
            "pl" => Ok(Lang::Pl),
            "pt" => Ok(Lang::Pt),
            "ro" => Ok(Lang::Ro),
            "hu" => Ok(Lang::Hu),
            "sv" => Ok(Lang::Sv),
            "tr" => Ok(Lang::Tr),
            "ja" => Ok(Lang::Ja),
            "cn" => Ok(Lang::Cn),
            "ru" => Ok(Lang::Ru),
            "ko" => Ok(Lang::Ko),
            "ar" => Ok(Lang::Ar),
            other => Err(I18nError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Translations for a single language, keyed by source text
/// (optionally suffixed with `__<context>`)
pub type TranslationMap = HashMap<String, String>;

/// The full translation cache: one [`TranslationMap`] per language
pub type Translations = HashMap<Lang, TranslationMap>;

/// Body of `POST /translate`
///
/// Carries the key to translate plus the caller's full language set so
/// the server can translate into every needed language in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslateRequest {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "forceTemporary", skip_serializing_if = "Option::is_none")]
    pub force_temporary: Option<HashMap<Lang, String>>,
    pub languages: Vec<Lang>,
    #[serde(rename = "primaryLanguage")]
    pub primary_language: Lang,
}

/// Payload of a successful `POST /translate`: the requested key
/// translated into every language the server handled
#[derive(Debug, Clone, Deserialize)]
pub struct TranslatedKey {
    pub translation: HashMap<Lang, String>,
}

/// Response envelope for `POST /translate`
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateOneResponse {
    pub ok: bool,
    #[serde(default)]
    pub data: Option<TranslatedKey>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TranslateOneResponse {
    /// Failure shape used when the transport itself breaks down
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Empty success shape for a lookup whose key was already in flight
    pub fn skipped() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
            message: None,
        }
    }
}

/// Payload of `GET /translate/{lang}`: the translation map for one
/// language plus the server-side correlation id and watermark
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageTranslations {
    pub translations: TranslationMap,
    #[serde(rename = "uniqueId", default)]
    pub unique_id: Option<String>,
    #[serde(rename = "lastRefresh", default)]
    pub last_refresh: Option<String>,
}

/// Response envelope for `GET /translate/{lang}`
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageTranslationsResponse {
    pub ok: bool,
    #[serde(default)]
    pub data: Option<LanguageTranslations>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LanguageTranslationsResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// Payload of the bulk `GET /translate`: nested maps for every language
#[derive(Debug, Clone, Deserialize)]
pub struct AllTranslations {
    pub translations: Translations,
    #[serde(rename = "uniqueId", default)]
    pub unique_id: Option<String>,
    #[serde(rename = "lastRefresh", default)]
    pub last_refresh: Option<String>,
}

/// Response envelope for the bulk `GET /translate`
#[derive(Debug, Clone, Deserialize)]
pub struct AllTranslationsResponse {
    pub ok: bool,
    #[serde(default)]
    pub data: Option<AllTranslations>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AllTranslationsResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// Body of `POST /translate/last-used-translations`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    #[serde(rename = "primaryLanguage")]
    pub primary_language: Lang,
    #[serde(rename = "translationsUsage")]
    pub translations_usage: HashMap<String, String>,
}

/// Response envelope for the usage report
#[derive(Debug, Clone, Deserialize)]
pub struct UsageReportResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UsageReportResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            message: None,
        }
    }
}

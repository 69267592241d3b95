//! Configuration for the translation store
//!
//! [`LanguageConfig`] describes the language set: the primary language
//! the keys are written in, the supported targets, and where to land
//! when a requested language is outside that set. [`I18nKeylessConfig`]
//! wraps it with the service credentials, storage, and tuning knobs.
//!
//! # Example
//!
//! ```ignore
//! use i18n_keyless::{I18nKeyless, I18nKeylessConfig, Lang, LanguageConfig, MemoryStorage};
//! use std::sync::Arc;
//!
//! let mut config = I18nKeylessConfig::new(LanguageConfig::new(
//!     Lang::En,
//!     vec![Lang::Fr, Lang::Es],
//! ));
//! config
//!     .with_api_key("my-api-key")
//!     .with_storage(Arc::new(MemoryStorage::new()));
//! let store = I18nKeyless::init(config).await?;
//! ```

use crate::api::TranslationBackend;
use crate::error::{I18nError, I18nResult};
use crate::queue::DEFAULT_CONCURRENCY;
use crate::storage::KeyValueStorage;
use crate::types::Lang;
use std::sync::Arc;

/// The language set the store operates over
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Language the translation keys themselves are written in
    pub primary: Lang,
    /// Languages the store will translate into
    pub supported: Vec<Lang>,
    /// Where unsupported languages land; defaults to `primary`
    pub fallback: Option<Lang>,
    /// Language to start in before any stored choice is restored;
    /// defaults to `primary`
    pub init_with_default: Option<Lang>,
}

impl LanguageConfig {
    pub fn new(primary: Lang, supported: Vec<Lang>) -> Self {
        Self {
            primary,
            supported,
            fallback: None,
            init_with_default: None,
        }
    }

    pub fn with_fallback(&mut self, lang: Lang) -> &mut Self {
        self.fallback = Some(lang);
        self
    }

    pub fn with_init_with_default(&mut self, lang: Lang) -> &mut Self {
        self.init_with_default = Some(lang);
        self
    }

    pub fn fallback_or_primary(&self) -> Lang {
        self.fallback.unwrap_or(self.primary)
    }

    /// The language the store starts in before hydration
    pub fn default_language(&self) -> Lang {
        self.init_with_default.unwrap_or(self.primary)
    }

    pub fn is_supported(&self, lang: Lang) -> bool {
        lang == self.primary || self.supported.contains(&lang)
    }

    /// Maps a requested language into the configured set
    ///
    /// Unsupported languages resolve to the fallback (or the primary
    /// when no fallback is set), with a warning.
    pub fn validate_language(&self, lang: Lang) -> Lang {
        if self.is_supported(lang) {
            return lang;
        }
        let fallback = self.fallback_or_primary();
        tracing::warn!(
            "i18n-keyless: language {} is not supported, falling back to {}",
            lang,
            fallback
        );
        fallback
    }
}

/// Everything [`crate::I18nKeyless::init`] needs
///
/// At least one of `api_key`, `api_url`, or `backend` must be set, and
/// `storage` is mandatory.
#[derive(Clone)]
pub struct I18nKeylessConfig {
    pub languages: LanguageConfig,
    /// Bearer key for the hosted translation service
    pub api_key: Option<String>,
    /// Endpoint override for self-hosted deployments
    pub api_url: Option<String>,
    /// Where the cache persists between runs
    pub storage: Option<Arc<dyn KeyValueStorage>>,
    /// Custom backend; when set, `api_key`/`api_url` are ignored
    pub backend: Option<Arc<dyn TranslationBackend>>,
    /// Translation queue worker count
    pub concurrency: usize,
    /// When false, missing keys are never sent for translation
    pub add_missing_translations: bool,
    /// Keys longer than this (in characters) are served untranslated
    pub max_key_length: Option<usize>,
    /// Logs every cache lookup
    pub debug: bool,
    /// Called once the store is hydrated
    pub on_init: Option<Arc<dyn Fn(Lang) + Send + Sync>>,
    /// Called after every language change
    pub on_set_language: Option<Arc<dyn Fn(Lang) + Send + Sync>>,
}

impl I18nKeylessConfig {
    pub fn new(languages: LanguageConfig) -> Self {
        Self {
            languages,
            api_key: None,
            api_url: None,
            storage: None,
            backend: None,
            concurrency: DEFAULT_CONCURRENCY,
            add_missing_translations: true,
            max_key_length: None,
            debug: false,
            on_init: None,
            on_set_language: None,
        }
    }

    pub fn with_api_key(&mut self, api_key: &str) -> &mut Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_api_url(&mut self, api_url: &str) -> &mut Self {
        self.api_url = Some(api_url.to_string());
        self
    }

    pub fn with_storage(&mut self, storage: Arc<dyn KeyValueStorage>) -> &mut Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_backend(&mut self, backend: Arc<dyn TranslationBackend>) -> &mut Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_concurrency(&mut self, concurrency: usize) -> &mut Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_add_missing_translations(&mut self, add: bool) -> &mut Self {
        self.add_missing_translations = add;
        self
    }

    pub fn with_max_key_length(&mut self, max: usize) -> &mut Self {
        self.max_key_length = Some(max);
        self
    }

    pub fn with_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    pub fn with_on_init<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Lang) + Send + Sync + 'static,
    {
        self.on_init = Some(Arc::new(callback));
        self
    }

    pub fn with_on_set_language<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Lang) + Send + Sync + 'static,
    {
        self.on_set_language = Some(Arc::new(callback));
        self
    }

    /// Fills in the derivable language defaults
    pub(crate) fn normalize(&mut self) {
        if self.languages.fallback.is_none() {
            self.languages.fallback = Some(self.languages.primary);
        }
        if self.languages.init_with_default.is_none() {
            self.languages.init_with_default = Some(self.languages.primary);
        }
        if let Some(initial) = self.languages.init_with_default {
            if initial != self.languages.primary && !self.languages.supported.contains(&initial) {
                self.languages.supported.push(initial);
            }
        }
    }

    pub(crate) fn validate(&self) -> I18nResult<()> {
        if self.languages.supported.is_empty() {
            return Err(I18nError::ConfigError(
                "i18n-keyless: languages.supported must not be empty".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(I18nError::ConfigError(
                "i18n-keyless: concurrency must be at least 1".to_string(),
            ));
        }
        if self.storage.is_none() {
            return Err(I18nError::ConfigError(
                "i18n-keyless: storage is required".to_string(),
            ));
        }
        if self.api_key.is_none() && self.api_url.is_none() && self.backend.is_none() {
            return Err(I18nError::ConfigError(
                "i18n-keyless: you must provide an API key, an API URL, or a custom translation backend"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for I18nKeylessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18nKeylessConfig")
            .field("languages", &self.languages)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("has_storage", &self.storage.is_some())
            .field("has_backend", &self.backend.is_some())
            .field("concurrency", &self.concurrency)
            .field("add_missing_translations", &self.add_missing_translations)
            .field("max_key_length", &self.max_key_length)
            .field("debug", &self.debug)
            .finish()
    }
}

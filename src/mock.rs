//! Mock translation backend for testing
//!
//! This module provides a deterministic, network-free backend for
//! exercising the store without API keys or a running service. Every
//! call is recorded so tests can assert on request bodies, fetch
//! parameters, and call counts.
//!
//! # Example
//!
//! ```ignore
//! use i18n_keyless::{MockBackend, MockMode, TranslationBackend};
//!
//! #[tokio::test]
//! async fn test_marker_mode() {
//!     let mock = MockBackend::new(MockMode::Marker);
//!     let response = mock.translate_one(&request, None).await;
//!     assert_eq!(response.data.unwrap().translation[&Lang::Fr], "[fr] Hello");
//! }
//! ```

use crate::api::TranslationBackend;
use crate::types::{
    AllTranslations, AllTranslationsResponse, Lang, LanguageTranslations,
    LanguageTranslationsResponse, TranslateOneResponse, TranslateRequest, TranslatedKey,
    TranslationMap, Translations, UsageReport, UsageReportResponse,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Mock response modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Serve from a predefined translation cache; keys with no canned
    /// entry fall back to the marker form
    Canned(Translations),

    /// Translate every key as "[<lang>] <key>"
    /// This keeps the source key visible for assertions
    Marker,

    /// Simulate a failing service: every call returns `ok: false` with
    /// this error
    Failure(String),
}

/// Mock backend that simulates the translation service
///
/// Responses are synthesized from the configured [`MockMode`]; the
/// optional `unique_id`, `last_refresh`, and `message` fields are echoed
/// in successful responses the way the real service would send them.
pub struct MockBackend {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    unique_id: Option<String>,
    last_refresh: Option<String>,
    message: Option<String>,
    translate_requests: Mutex<Vec<TranslateRequest>>,
    language_fetches: Mutex<Vec<(Lang, Option<String>)>>,
    all_fetches: Mutex<Vec<Option<String>>>,
    usage_reports: Mutex<Vec<UsageReport>>,
    seen_unique_ids: Mutex<Vec<Option<String>>>,
}

impl MockBackend {
    /// Create a new MockBackend with the given mode
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay_ms: 0,
            unique_id: None,
            last_refresh: None,
            message: None,
            translate_requests: Mutex::new(Vec::new()),
            language_fetches: Mutex::new(Vec::new()),
            all_fetches: Mutex::new(Vec::new()),
            usage_reports: Mutex::new(Vec::new()),
            seen_unique_ids: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockBackend with simulated network delay
    ///
    /// # Arguments
    ///
    /// * `mode` - The response mode
    /// * `delay_ms` - Simulated delay in milliseconds
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new(mode)
        }
    }

    /// Sets the correlation id echoed in fetch responses
    pub fn with_unique_id(mut self, unique_id: &str) -> Self {
        self.unique_id = Some(unique_id.to_string());
        self
    }

    /// Sets the refresh watermark echoed in fetch responses
    pub fn with_last_refresh(mut self, last_refresh: &str) -> Self {
        self.last_refresh = Some(last_refresh.to_string());
        self
    }

    /// Sets the service message attached to successful responses
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Requests received by [`TranslationBackend::translate_one`]
    pub fn translate_requests(&self) -> Vec<TranslateRequest> {
        self.translate_requests.lock().expect("lock poisoned").clone()
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_requests.lock().expect("lock poisoned").len()
    }

    /// `(lang, last_refresh)` pairs seen by `fetch_language`
    pub fn language_fetches(&self) -> Vec<(Lang, Option<String>)> {
        self.language_fetches.lock().expect("lock poisoned").clone()
    }

    pub fn language_fetch_calls(&self) -> usize {
        self.language_fetches.lock().expect("lock poisoned").len()
    }

    pub fn all_fetch_calls(&self) -> usize {
        self.all_fetches.lock().expect("lock poisoned").len()
    }

    /// Usage reports received by `report_usage`
    pub fn usage_reports(&self) -> Vec<UsageReport> {
        self.usage_reports.lock().expect("lock poisoned").clone()
    }

    pub fn usage_report_calls(&self) -> usize {
        self.usage_reports.lock().expect("lock poisoned").len()
    }

    /// The `unique_id` header value of every call, in order
    pub fn seen_unique_ids(&self) -> Vec<Option<String>> {
        self.seen_unique_ids.lock().expect("lock poisoned").clone()
    }

    /// Internal helper to apply the simulated delay
    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn record_unique_id(&self, unique_id: Option<&str>) {
        self.seen_unique_ids
            .lock()
            .expect("lock poisoned")
            .push(unique_id.map(String::from));
    }

    fn marker(lang: Lang, key: &str) -> String {
        format!("[{}] {}", lang.code(), key)
    }

    fn language_map(&self, lang: Lang) -> TranslationMap {
        match &self.mode {
            MockMode::Canned(translations) => {
                translations.get(&lang).cloned().unwrap_or_default()
            }
            _ => TranslationMap::new(),
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate_one(
        &self,
        request: &TranslateRequest,
        unique_id: Option<&str>,
    ) -> TranslateOneResponse {
        self.apply_delay().await;
        self.record_unique_id(unique_id);
        self.translate_requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());

        let lookup_key = match &request.context {
            Some(context) => format!("{}__{}", request.key, context),
            None => request.key.clone(),
        };

        match &self.mode {
            MockMode::Failure(msg) => TranslateOneResponse::failure(msg.clone()),
            MockMode::Canned(translations) => {
                let mut translation = HashMap::new();
                for lang in &request.languages {
                    let text = translations
                        .get(lang)
                        .and_then(|map| map.get(&lookup_key))
                        .cloned()
                        .unwrap_or_else(|| Self::marker(*lang, &request.key));
                    translation.insert(*lang, text);
                }
                TranslateOneResponse {
                    ok: true,
                    data: Some(TranslatedKey { translation }),
                    error: None,
                    message: self.message.clone(),
                }
            }
            MockMode::Marker => {
                let translation = request
                    .languages
                    .iter()
                    .map(|lang| (*lang, Self::marker(*lang, &request.key)))
                    .collect();
                TranslateOneResponse {
                    ok: true,
                    data: Some(TranslatedKey { translation }),
                    error: None,
                    message: self.message.clone(),
                }
            }
        }
    }

    async fn fetch_language(
        &self,
        lang: Lang,
        last_refresh: Option<&str>,
        unique_id: Option<&str>,
    ) -> LanguageTranslationsResponse {
        self.apply_delay().await;
        self.record_unique_id(unique_id);
        self.language_fetches
            .lock()
            .expect("lock poisoned")
            .push((lang, last_refresh.map(String::from)));

        match &self.mode {
            MockMode::Failure(msg) => LanguageTranslationsResponse::failure(msg.clone()),
            _ => LanguageTranslationsResponse {
                ok: true,
                data: Some(LanguageTranslations {
                    translations: self.language_map(lang),
                    unique_id: self.unique_id.clone(),
                    last_refresh: self.last_refresh.clone(),
                }),
                error: None,
                message: self.message.clone(),
            },
        }
    }

    async fn fetch_all_languages(
        &self,
        last_refresh: Option<&str>,
        unique_id: Option<&str>,
    ) -> AllTranslationsResponse {
        self.apply_delay().await;
        self.record_unique_id(unique_id);
        self.all_fetches
            .lock()
            .expect("lock poisoned")
            .push(last_refresh.map(String::from));

        match &self.mode {
            MockMode::Failure(msg) => AllTranslationsResponse::failure(msg.clone()),
            MockMode::Canned(translations) => AllTranslationsResponse {
                ok: true,
                data: Some(AllTranslations {
                    translations: translations.clone(),
                    unique_id: self.unique_id.clone(),
                    last_refresh: self.last_refresh.clone(),
                }),
                error: None,
                message: self.message.clone(),
            },
            MockMode::Marker => AllTranslationsResponse {
                ok: true,
                data: Some(AllTranslations {
                    translations: Translations::new(),
                    unique_id: self.unique_id.clone(),
                    last_refresh: self.last_refresh.clone(),
                }),
                error: None,
                message: self.message.clone(),
            },
        }
    }

    async fn report_usage(
        &self,
        report: &UsageReport,
        unique_id: Option<&str>,
    ) -> UsageReportResponse {
        self.apply_delay().await;
        self.record_unique_id(unique_id);
        self.usage_reports
            .lock()
            .expect("lock poisoned")
            .push(report.clone());

        match &self.mode {
            MockMode::Failure(msg) => UsageReportResponse::failure(msg.clone()),
            _ => UsageReportResponse {
                ok: true,
                error: None,
                message: self.message.clone(),
            },
        }
    }

    fn backend_name(&self) -> &str {
        "Mock Backend"
    }
}

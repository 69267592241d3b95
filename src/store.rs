//! The translation store
//!
//! [`I18nKeyless`] owns the translation cache and everything around it:
//! hydration from storage, synchronous key resolution, the background
//! queue that fetches missing translations, language switching, and the
//! usage ledger. Handles are cheap clones sharing one state, so the
//! store can be passed freely across tasks.
//!
//! # Example
//!
//! ```ignore
//! use i18n_keyless::{I18nKeyless, I18nKeylessConfig, Lang, LanguageConfig, MemoryStorage};
//! use std::sync::Arc;
//!
//! let mut config = I18nKeylessConfig::new(LanguageConfig::new(
//!     Lang::En,
//!     vec![Lang::En, Lang::Fr],
//! ));
//! config
//!     .with_api_key("my-api-key")
//!     .with_storage(Arc::new(MemoryStorage::new()));
//!
//! let store = I18nKeyless::init(config).await?;
//! store.set_language(Lang::Fr).await;
//! // Misses return the source text and queue a background fetch.
//! let text = store.translate("Welcome to the app");
//! ```

use crate::api::{HttpBackend, TranslationBackend};
use crate::config::I18nKeylessConfig;
use crate::error::{I18nError, I18nResult};
use crate::queue::TaskQueue;
use crate::resolver::{self, TranslateOptions};
use crate::storage::{
    KeyValueStorage, STORAGE_KEY_CURRENT_LANGUAGE, STORAGE_KEY_LAST_REFRESH,
    STORAGE_KEY_TRANSLATIONS, STORAGE_KEY_UNIQUE_ID,
};
use crate::types::{
    AllTranslationsResponse, Lang, LanguageTranslationsResponse, TranslateOneResponse,
    TranslateRequest, Translations, UsageReport,
};
use crate::usage::UsageLedger;
use std::collections::HashSet;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::mpsc;

struct StoreState {
    current_language: Lang,
    translations: Translations,
    unique_id: Option<String>,
    last_refresh: Option<String>,
    translating: HashSet<String>,
    usage: UsageLedger,
}

struct StoreInner {
    config: I18nKeylessConfig,
    backend: Arc<dyn TranslationBackend>,
    storage: Arc<dyn KeyValueStorage>,
    queue: TaskQueue<TranslateOneResponse>,
    state: RwLock<StoreState>,
}

/// Handle to the translation store
///
/// Created by [`I18nKeyless::init`]. All clones share the same cache,
/// queue, and storage.
#[derive(Clone)]
pub struct I18nKeyless {
    inner: Arc<StoreInner>,
}

impl I18nKeyless {
    /// Builds the store and hydrates it from storage
    ///
    /// Fails fast on an incomplete configuration. Once hydration is
    /// done the `on_init` callback fires with the active language and
    /// any usage left over from a previous run is flushed.
    pub async fn init(mut config: I18nKeylessConfig) -> I18nResult<Self> {
        config.normalize();
        config.validate()?;

        let storage = config.storage.clone().ok_or_else(|| {
            I18nError::ConfigError("i18n-keyless: storage is required".to_string())
        })?;
        let backend: Arc<dyn TranslationBackend> = match config.backend.clone() {
            Some(backend) => backend,
            None => Arc::new(HttpBackend::new(
                config.api_key.clone(),
                config.api_url.clone(),
            )?),
        };

        let queue = TaskQueue::new(config.concurrency);
        let empty_events = queue.on_empty();

        let default_language = config.languages.default_language();
        let inner = Arc::new(StoreInner {
            config,
            backend,
            storage,
            queue,
            state: RwLock::new(StoreState {
                current_language: default_language,
                translations: Translations::new(),
                unique_id: None,
                last_refresh: None,
                translating: HashSet::new(),
                usage: UsageLedger::new(),
            }),
        });
        let store = Self { inner };

        store.hydrate().await;
        spawn_empty_listener(Arc::downgrade(&store.inner), empty_events);

        if let Some(on_init) = &store.inner.config.on_init {
            on_init(store.current_language());
        }
        store.flush_usage().await;

        tracing::info!(
            backend = store.inner.backend.backend_name(),
            language = %store.current_language(),
            "i18n-keyless: store initialized"
        );
        Ok(store)
    }

    /// Restores cache, language, and server markers from storage
    ///
    /// Every key degrades independently: unreadable or corrupt values
    /// fall back to a clean default with a warning, never an error.
    async fn hydrate(&self) {
        let storage = &self.inner.storage;
        let languages = &self.inner.config.languages;

        let translations = match storage.read(STORAGE_KEY_TRANSLATIONS).await {
            Ok(Some(raw)) => match serde_json::from_str::<Translations>(&raw) {
                Ok(translations) => translations,
                Err(e) => {
                    tracing::warn!(
                        "i18n-keyless: stored translations are unreadable, starting empty: {}",
                        e
                    );
                    Translations::new()
                }
            },
            Ok(None) => Translations::new(),
            Err(e) => {
                tracing::warn!("i18n-keyless: failed to read stored translations: {}", e);
                Translations::new()
            }
        };

        let current_language = match storage.read(STORAGE_KEY_CURRENT_LANGUAGE).await {
            Ok(Some(raw)) => match raw.parse::<Lang>() {
                Ok(lang) => languages.validate_language(lang),
                Err(_) => {
                    tracing::warn!(
                        "i18n-keyless: stored language {:?} is unknown, using the default",
                        raw
                    );
                    languages.default_language()
                }
            },
            Ok(None) => languages.default_language(),
            Err(e) => {
                tracing::warn!("i18n-keyless: failed to read stored language: {}", e);
                languages.default_language()
            }
        };

        let unique_id = match storage.read(STORAGE_KEY_UNIQUE_ID).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("i18n-keyless: failed to read stored unique id: {}", e);
                None
            }
        };
        let last_refresh = match storage.read(STORAGE_KEY_LAST_REFRESH).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "i18n-keyless: failed to read stored refresh watermark: {}",
                    e
                );
                None
            }
        };

        let mut state = self.inner.state.write().expect("lock poisoned");
        state.translations = translations;
        state.current_language = current_language;
        state.unique_id = unique_id;
        state.last_refresh = last_refresh;
    }

    /// Translates a key with default options
    pub fn translate(&self, key: &str) -> String {
        self.translate_with(key, &TranslateOptions::new())
    }

    /// Translates a key against the cache
    ///
    /// Never blocks on the network: a cache miss returns the source
    /// text immediately and queues the key for background translation.
    /// Later calls see the cached translation once the fetch lands.
    pub fn translate_with(&self, key: &str, options: &TranslateOptions) -> String {
        let outcome = {
            let mut state = self.inner.state.write().expect("lock poisoned");
            let outcome = resolver::resolve(
                key,
                state.current_language,
                &self.inner.config,
                &state.translations,
                options,
            );
            if let Some(lookup_key) = &outcome.lookup_key {
                state.usage.record(lookup_key);
            }
            outcome
        };

        if outcome.fetch {
            if let Some(lookup_key) = outcome.lookup_key {
                self.enqueue_fetch(lookup_key, key, options);
            }
        }
        outcome.text
    }

    /// Queues a background fetch for a lookup key
    ///
    /// Enqueueing is cheap and idempotent: the queue joins duplicate ids
    /// while the task is still queued, and the task body itself bails
    /// out if the key is already in flight.
    fn enqueue_fetch(&self, lookup_key: String, key: &str, options: &TranslateOptions) {
        let request = TranslateRequest {
            key: key.to_string(),
            context: options.context.clone(),
            force_temporary: options.force_temporary.clone(),
            languages: self.inner.config.languages.supported.clone(),
            primary_language: self.inner.config.languages.primary,
        };
        let inner = Arc::clone(&self.inner);
        let id = lookup_key.clone();
        self.inner.queue.add(&id, 1, async move {
            StoreInner::run_translate_task(inner, lookup_key, request).await
        });
    }

    /// Switches the active language, returning what was actually set
    ///
    /// Unsupported languages resolve to the configured fallback. The
    /// choice is persisted, accumulated usage is flushed, and a
    /// non-primary language is refreshed from the service right away.
    pub async fn set_language(&self, lang: Lang) -> Lang {
        let resolved = self.inner.config.languages.validate_language(lang);
        {
            let mut state = self.inner.state.write().expect("lock poisoned");
            state.current_language = resolved;
        }
        self.inner
            .persist_value(STORAGE_KEY_CURRENT_LANGUAGE, resolved.code())
            .await;

        if let Some(on_set_language) = &self.inner.config.on_set_language {
            on_set_language(resolved);
        }
        self.flush_usage().await;

        if resolved != self.inner.config.languages.primary {
            if let Err(e) = self.refresh().await {
                tracing::warn!(
                    "i18n-keyless: refresh after switching to {} failed: {}",
                    resolved,
                    e
                );
            }
        }
        resolved
    }

    /// Fetches the current language's translations and merges them in
    ///
    /// A no-op under the primary language.
    pub async fn refresh(&self) -> I18nResult<()> {
        let (lang, last_refresh, unique_id) = {
            let state = self.inner.state.read().expect("lock poisoned");
            (
                state.current_language,
                state.last_refresh.clone(),
                state.unique_id.clone(),
            )
        };
        if lang == self.inner.config.languages.primary {
            return Ok(());
        }

        let response = self
            .inner
            .backend
            .fetch_language(lang, last_refresh.as_deref(), unique_id.as_deref())
            .await;
        if !response.ok {
            surface_message("fetch", &response.message);
            return Err(I18nError::NetworkError(
                response
                    .error
                    .clone()
                    .unwrap_or_else(|| "translation fetch failed".to_string()),
            ));
        }
        self.set_translations(lang, &response).await;
        Ok(())
    }

    /// Fetches every language's translations and merges them in
    pub async fn refresh_all_languages(&self) -> I18nResult<()> {
        let (last_refresh, unique_id) = {
            let state = self.inner.state.read().expect("lock poisoned");
            (state.last_refresh.clone(), state.unique_id.clone())
        };

        let response = self
            .inner
            .backend
            .fetch_all_languages(last_refresh.as_deref(), unique_id.as_deref())
            .await;
        if !response.ok {
            surface_message("fetch", &response.message);
            return Err(I18nError::NetworkError(
                response
                    .error
                    .clone()
                    .unwrap_or_else(|| "translation fetch failed".to_string()),
            ));
        }
        self.set_all_translations(&response).await;
        Ok(())
    }

    /// Merges a language fetch response into the cache
    ///
    /// Failed responses are ignored; successful ones are merged key by
    /// key (never wholesale replacement), persisted, and their server
    /// markers adopted.
    pub async fn set_translations(&self, lang: Lang, response: &LanguageTranslationsResponse) {
        self.inner.apply_language_response(lang, response).await;
    }

    /// Merges a bulk fetch response into the cache
    pub async fn set_all_translations(&self, response: &AllTranslationsResponse) {
        self.inner.apply_all_response(response).await;
    }

    /// Sends the accumulated usage ledger to the service
    ///
    /// Skipped when the ledger is empty. On failure the drained entries
    /// go back into the ledger for the next flush.
    pub async fn flush_usage(&self) {
        let (drained, unique_id) = {
            let mut state = self.inner.state.write().expect("lock poisoned");
            if state.usage.is_empty() {
                return;
            }
            (state.usage.drain(), state.unique_id.clone())
        };

        let report = UsageReport {
            primary_language: self.inner.config.languages.primary,
            translations_usage: drained.clone(),
        };
        let response = self
            .inner
            .backend
            .report_usage(&report, unique_id.as_deref())
            .await;
        surface_message("usage", &response.message);

        if !response.ok {
            tracing::debug!(
                "i18n-keyless: usage report failed, keeping {} entries for the next flush",
                drained.len()
            );
            let mut state = self.inner.state.write().expect("lock poisoned");
            state.usage.restore(drained);
        }
    }

    /// Wipes the cache, the server markers, and their stored copies
    ///
    /// The language resets to the configured default.
    pub async fn clear(&self) {
        {
            let mut state = self.inner.state.write().expect("lock poisoned");
            state.translations.clear();
            state.current_language = self.inner.config.languages.default_language();
            state.unique_id = None;
            state.last_refresh = None;
            state.translating.clear();
            state.usage = UsageLedger::new();
        }
        for key in [
            STORAGE_KEY_TRANSLATIONS,
            STORAGE_KEY_CURRENT_LANGUAGE,
            STORAGE_KEY_UNIQUE_ID,
            STORAGE_KEY_LAST_REFRESH,
        ] {
            if let Err(e) = self.inner.storage.remove(key).await {
                tracing::warn!("i18n-keyless: failed to remove {}: {}", key, e);
            }
        }
    }

    pub fn current_language(&self) -> Lang {
        self.inner
            .state
            .read()
            .expect("lock poisoned")
            .current_language
    }

    pub fn unique_id(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .expect("lock poisoned")
            .unique_id
            .clone()
    }

    pub fn last_refresh(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .expect("lock poisoned")
            .last_refresh
            .clone()
    }

    /// Snapshot of the whole translation cache
    pub fn translations(&self) -> Translations {
        self.inner
            .state
            .read()
            .expect("lock poisoned")
            .translations
            .clone()
    }

    /// True when no translation fetch is queued or running
    pub fn is_idle(&self) -> bool {
        self.inner.queue.is_idle()
    }

    /// Number of usage entries waiting for the next flush
    pub fn pending_usage(&self) -> usize {
        self.inner.state.read().expect("lock poisoned").usage.len()
    }
}

impl StoreInner {
    /// Body of a queued translation task
    ///
    /// The `translating` marker covers the running window (queue id
    /// dedup only covers the queued window): the first task for a key
    /// claims it, any duplicate that reaches a worker while the claim
    /// is held returns without touching the network. The claim is held
    /// by a guard that releases it when the task settles, a panicking
    /// backend included, so the next lookup can always retry.
    async fn run_translate_task(
        inner: Arc<StoreInner>,
        lookup_key: String,
        request: TranslateRequest,
    ) -> TranslateOneResponse {
        {
            let mut state = inner.state.write().expect("lock poisoned");
            if !state.translating.insert(lookup_key.clone()) {
                tracing::debug!(
                    "i18n-keyless: translation of {:?} already in flight",
                    lookup_key
                );
                return TranslateOneResponse::skipped();
            }
        }
        let _claim = InFlightClaim {
            inner: Arc::clone(&inner),
            lookup_key: lookup_key.clone(),
        };

        let unique_id = {
            let state = inner.state.read().expect("lock poisoned");
            state.unique_id.clone()
        };

        let response = inner
            .backend
            .translate_one(&request, unique_id.as_deref())
            .await;
        surface_message("translate", &response.message);

        if response.ok {
            if let Some(data) = &response.data {
                {
                    let mut state = inner.state.write().expect("lock poisoned");
                    for (lang, text) in &data.translation {
                        state
                            .translations
                            .entry(*lang)
                            .or_default()
                            .insert(lookup_key.clone(), text.clone());
                    }
                }
                inner.persist_translations().await;
            }
        } else if let Some(error) = &response.error {
            tracing::warn!(
                "i18n-keyless: failed to translate {:?}: {}",
                lookup_key,
                error
            );
        }
        response
    }

    async fn persist_translations(&self) {
        let raw = {
            let state = self.state.read().expect("lock poisoned");
            match serde_json::to_string(&state.translations) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!("i18n-keyless: failed to serialize translations: {}", e);
                    return;
                }
            }
        };
        if let Err(e) = self.storage.write(STORAGE_KEY_TRANSLATIONS, &raw).await {
            tracing::warn!("i18n-keyless: failed to persist translations: {}", e);
        }
    }

    async fn persist_value(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.write(key, value).await {
            tracing::warn!("i18n-keyless: failed to persist {}: {}", key, e);
        }
    }

    /// Adopts and persists the correlation id and refresh watermark a
    /// fetch response carried, when it carried them
    async fn update_server_markers(&self, unique_id: Option<&str>, last_refresh: Option<&str>) {
        {
            let mut state = self.state.write().expect("lock poisoned");
            if let Some(unique_id) = unique_id {
                state.unique_id = Some(unique_id.to_string());
            }
            if let Some(last_refresh) = last_refresh {
                state.last_refresh = Some(last_refresh.to_string());
            }
        }
        if let Some(unique_id) = unique_id {
            self.persist_value(STORAGE_KEY_UNIQUE_ID, unique_id).await;
        }
        if let Some(last_refresh) = last_refresh {
            self.persist_value(STORAGE_KEY_LAST_REFRESH, last_refresh)
                .await;
        }
    }

    async fn apply_language_response(&self, lang: Lang, response: &LanguageTranslationsResponse) {
        surface_message("fetch", &response.message);
        if !response.ok {
            if let Some(error) = &response.error {
                tracing::warn!(
                    "i18n-keyless: failed to fetch translations for {}: {}",
                    lang,
                    error
                );
            }
            return;
        }
        let Some(data) = &response.data else { return };

        {
            let mut state = self.state.write().expect("lock poisoned");
            let map = state.translations.entry(lang).or_default();
            for (key, text) in &data.translations {
                map.insert(key.clone(), text.clone());
            }
        }
        self.persist_translations().await;
        self.update_server_markers(data.unique_id.as_deref(), data.last_refresh.as_deref())
            .await;
    }

    async fn apply_all_response(&self, response: &AllTranslationsResponse) {
        surface_message("fetch", &response.message);
        if !response.ok {
            if let Some(error) = &response.error {
                tracing::warn!("i18n-keyless: failed to fetch translations: {}", error);
            }
            return;
        }
        let Some(data) = &response.data else { return };

        {
            let mut state = self.state.write().expect("lock poisoned");
            for (lang, incoming) in &data.translations {
                let map = state.translations.entry(*lang).or_default();
                for (key, text) in incoming {
                    map.insert(key.clone(), text.clone());
                }
            }
        }
        self.persist_translations().await;
        self.update_server_markers(data.unique_id.as_deref(), data.last_refresh.as_deref())
            .await;
    }

    /// Runs after the translation queue drains: pulls the freshly
    /// translated keys for the current language so the cache converges
    /// with what the server stored
    async fn refresh_after_drain(inner: Arc<StoreInner>) {
        let (lang, last_refresh, unique_id) = {
            let state = inner.state.read().expect("lock poisoned");
            (
                state.current_language,
                state.last_refresh.clone(),
                state.unique_id.clone(),
            )
        };
        if lang == inner.config.languages.primary {
            return;
        }

        tracing::debug!("i18n-keyless: translation queue drained, refreshing {}", lang);
        let response = inner
            .backend
            .fetch_language(lang, last_refresh.as_deref(), unique_id.as_deref())
            .await;
        inner.apply_language_response(lang, &response).await;
    }
}

/// Releases a key's `translating` claim when the claiming task settles
struct InFlightClaim {
    inner: Arc<StoreInner>,
    lookup_key: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        // Drop must not panic, so a poisoned lock is left alone.
        if let Ok(mut state) = self.inner.state.write() {
            state.translating.remove(&self.lookup_key);
        }
    }
}

fn spawn_empty_listener(weak: Weak<StoreInner>, mut events: mpsc::UnboundedReceiver<()>) {
    tokio::spawn(async move {
        while events.recv().await.is_some() {
            let Some(inner) = weak.upgrade() else { break };
            StoreInner::refresh_after_drain(inner).await;
        }
    });
}

/// Operator-facing notices the service attaches to responses (quota
/// warnings and the like)
fn surface_message(operation: &str, message: &Option<String>) {
    if let Some(message) = message {
        tracing::warn!("i18n-keyless [{}]: {}", operation, message);
    }
}

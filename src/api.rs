//! Translation service backend
//!
//! [`TranslationBackend`] is the seam between the store and the wire:
//! one method per service operation. [`HttpBackend`] is the production
//! implementation, speaking JSON over HTTPS to the translation API.
//! Backend methods never return `Result`; transport and HTTP failures
//! are folded into the response envelopes so callers handle exactly one
//! shape per operation.
//!
//! # Example
//!
//! ```ignore
//! use i18n_keyless::{HttpBackend, TranslationBackend};
//!
//! let backend = HttpBackend::new(Some("my-api-key".to_string()), None)?;
//! let response = backend.fetch_language(Lang::Fr, None, None).await;
//! if response.ok {
//!     println!("{} translations", response.data.map_or(0, |d| d.translations.len()));
//! }
//! ```

use crate::error::{I18nError, I18nResult};
use crate::types::{
    AllTranslationsResponse, Lang, LanguageTranslationsResponse, TranslateOneResponse,
    TranslateRequest, UsageReport, UsageReportResponse,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Service endpoint used when the caller does not configure one
pub const DEFAULT_API_URL: &str = "https://api.i18n-keyless.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The four operations the translation service exposes
///
/// Implementations must be shareable across tasks. Errors are reported
/// through the `ok`/`error` fields of each response, never by panicking.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Requests translation of a single key into every listed language
    async fn translate_one(
        &self,
        request: &TranslateRequest,
        unique_id: Option<&str>,
    ) -> TranslateOneResponse;

    /// Fetches the stored translation map for one language
    async fn fetch_language(
        &self,
        lang: Lang,
        last_refresh: Option<&str>,
        unique_id: Option<&str>,
    ) -> LanguageTranslationsResponse;

    /// Fetches the stored translation maps for every language
    async fn fetch_all_languages(
        &self,
        last_refresh: Option<&str>,
        unique_id: Option<&str>,
    ) -> AllTranslationsResponse;

    /// Reports which keys were recently used
    async fn report_usage(
        &self,
        report: &UsageReport,
        unique_id: Option<&str>,
    ) -> UsageReportResponse;

    /// Human-readable backend name for logs
    fn backend_name(&self) -> &str;
}

/// HTTPS client for the translation service
///
/// Authenticates with a bearer API key when one is configured; a custom
/// `api_url` may point at a self-hosted deployment that does its own
/// auth, in which case the key can be omitted.
pub struct HttpBackend {
    api_key: Option<String>,
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Builds a client for the given key and endpoint
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer key for the hosted service, if any
    /// * `api_url` - Endpoint override; defaults to [`DEFAULT_API_URL`]
    ///
    /// # Returns
    ///
    /// A ready backend, or an error if the key is present but empty or
    /// the HTTP client cannot be constructed.
    pub fn new(api_key: Option<String>, api_url: Option<String>) -> I18nResult<Self> {
        if let Some(key) = &api_key {
            if key.is_empty() {
                return Err(I18nError::ConfigError("API key cannot be empty".to_string()));
            }
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| I18nError::NetworkError(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            client,
            base_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        builder: reqwest::RequestBuilder,
        unique_id: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let builder = builder
            .header("unique_id", unique_id.unwrap_or(""))
            .header("Version", env!("CARGO_PKG_VERSION"));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<R, String> {
        let response = builder
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(format!("HTTP {}: {}", status, body));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| format!("failed to parse response: {}", e))
    }
}

#[async_trait]
impl TranslationBackend for HttpBackend {
    async fn translate_one(
        &self,
        request: &TranslateRequest,
        unique_id: Option<&str>,
    ) -> TranslateOneResponse {
        let builder = self
            .request(
                self.client.post(format!("{}/translate", self.base_url)),
                unique_id,
            )
            .json(request);
        match self.execute(builder).await {
            Ok(response) => response,
            Err(error) => TranslateOneResponse::failure(error),
        }
    }

    async fn fetch_language(
        &self,
        lang: Lang,
        last_refresh: Option<&str>,
        unique_id: Option<&str>,
    ) -> LanguageTranslationsResponse {
        let mut builder = self.request(
            self.client
                .get(format!("{}/translate/{}", self.base_url, lang)),
            unique_id,
        );
        if let Some(watermark) = last_refresh {
            builder = builder.query(&[("last_refresh", watermark)]);
        }
        match self.execute(builder).await {
            Ok(response) => response,
            Err(error) => LanguageTranslationsResponse::failure(error),
        }
    }

    async fn fetch_all_languages(
        &self,
        last_refresh: Option<&str>,
        unique_id: Option<&str>,
    ) -> AllTranslationsResponse {
        let mut builder = self.request(
            self.client.get(format!("{}/translate", self.base_url)),
            unique_id,
        );
        if let Some(watermark) = last_refresh {
            builder = builder.query(&[("last_refresh", watermark)]);
        }
        match self.execute(builder).await {
            Ok(response) => response,
            Err(error) => AllTranslationsResponse::failure(error),
        }
    }

    async fn report_usage(
        &self,
        report: &UsageReport,
        unique_id: Option<&str>,
    ) -> UsageReportResponse {
        let builder = self
            .request(
                self.client.post(format!(
                    "{}/translate/last-used-translations",
                    self.base_url
                )),
                unique_id,
            )
            .json(report);
        match self.execute(builder).await {
            Ok(response) => response,
            Err(error) => UsageReportResponse::failure(error),
        }
    }

    fn backend_name(&self) -> &str {
        "i18n-keyless API"
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Construction Tests ==========

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = HttpBackend::new(Some(String::new()), None);
        match result {
            Err(I18nError::ConfigError(message)) => assert!(message.contains("empty")),
            _ => panic!("Expected ConfigError for empty API key"),
        }
    }

    #[test]
    fn test_new_without_api_key_is_allowed() {
        let backend = HttpBackend::new(None, Some("http://localhost:8080".to_string())).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_new_defaults_base_url() {
        let backend = HttpBackend::new(Some("key-1".to_string()), None).unwrap();
        assert_eq!(backend.base_url(), DEFAULT_API_URL);
    }

    #[test]
    fn test_debug_masks_api_key() {
        let backend = HttpBackend::new(Some("secret-key-123".to_string()), None).unwrap();
        let out = format!("{:?}", backend);
        assert!(!out.contains("secret-key-123"));
        assert!(out.contains("***"));
    }

    #[test]
    fn test_backend_name() {
        let backend = HttpBackend::new(None, Some("http://localhost".to_string())).unwrap();
        assert_eq!(backend.backend_name(), "i18n-keyless API");
    }
}

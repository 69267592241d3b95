//! Cache lookup and placeholder replacement
//!
//! Resolution is a pure function over the current cache: given a key,
//! the active language, and the per-call options, it produces the text
//! to show now plus a verdict on whether the key must be sent for
//! translation. The store applies that verdict; nothing here touches
//! the network.

use crate::config::I18nKeylessConfig;
use crate::types::{Lang, Translations};
use regex::Regex;
use std::collections::HashMap;

/// Per-call options for [`crate::I18nKeyless::translate_with`]
///
/// # Example
///
/// ```ignore
/// use i18n_keyless::TranslateOptions;
///
/// let text = store.translate_with(
///     "Welcome {{name}}",
///     TranslateOptions::new()
///         .with_context("home screen greeting")
///         .with_replace(HashMap::from([("{{name}}".to_string(), "Ada".to_string())])),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Disambiguates homonym keys; becomes part of the cache key
    pub context: Option<String>,
    /// Literal placeholder substitutions applied to the resolved text
    pub replace: Option<HashMap<String, String>>,
    /// Per-language overrides; presence of the current language forces a
    /// re-translation fetch
    pub force_temporary: Option<HashMap<Lang, String>>,
    /// Logs this lookup even when the store-wide debug flag is off
    pub debug: bool,
}

impl TranslateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(&mut self, context: &str) -> &mut Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_replace(&mut self, replace: HashMap<String, String>) -> &mut Self {
        self.replace = Some(replace);
        self
    }

    pub fn with_force_temporary(&mut self, force: HashMap<Lang, String>) -> &mut Self {
        self.force_temporary = Some(force);
        self
    }

    pub fn with_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }
}

/// What a resolution decided
///
/// `lookup_key` is `None` when no cache lookup happened (primary
/// language, or an oversized key); `fetch` is only ever true when a
/// lookup happened.
pub(crate) struct ResolveOutcome {
    pub(crate) text: String,
    pub(crate) lookup_key: Option<String>,
    pub(crate) fetch: bool,
}

/// Resolves a key against the cache
///
/// Under the primary language the key is the answer by definition:
/// no lookup, no fetch, no replacement. Otherwise the cache is
/// consulted under `key` (or `key__context`), a fetch is requested for
/// misses and forced overrides, and placeholder replacement is applied
/// to whatever text is returned.
pub(crate) fn resolve(
    key: &str,
    current_language: Lang,
    config: &I18nKeylessConfig,
    translations: &Translations,
    options: &TranslateOptions,
) -> ResolveOutcome {
    if key.trim() != key {
        tracing::warn!(
            "i18n-keyless: key {:?} has surrounding whitespace, lookups are exact",
            key
        );
    }

    if current_language == config.languages.primary {
        return ResolveOutcome {
            text: key.to_string(),
            lookup_key: None,
            fetch: false,
        };
    }

    if let Some(max) = config.max_key_length {
        if key.chars().count() > max {
            tracing::warn!(
                "i18n-keyless: key {:?} is longer than {} characters, serving it untranslated",
                key,
                max
            );
            return ResolveOutcome {
                text: key.to_string(),
                lookup_key: None,
                fetch: false,
            };
        }
    }

    let lookup_key = match &options.context {
        Some(context) => format!("{}__{}", key, context),
        None => key.to_string(),
    };

    let found = translations
        .get(&current_language)
        .and_then(|map| map.get(&lookup_key))
        .cloned();

    let forced = options
        .force_temporary
        .as_ref()
        .is_some_and(|force| force.contains_key(&current_language));

    let fetch = config.add_missing_translations && (forced || found.is_none());

    if options.debug || config.debug {
        tracing::debug!(
            key = lookup_key.as_str(),
            language = %current_language,
            hit = found.is_some(),
            forced,
            fetch,
            "i18n-keyless: resolved key"
        );
    }

    let mut text = found.unwrap_or_else(|| key.to_string());
    if let Some(replace) = &options.replace {
        if !replace.is_empty() {
            text = apply_replacements(&text, replace);
        }
    }

    ResolveOutcome {
        text,
        lookup_key: Some(lookup_key),
        fetch,
    }
}

/// Single-pass multi-pattern literal substitution
///
/// All patterns are combined into one alternation so each position of
/// the input is rewritten at most once; replacement values are never
/// themselves re-matched. Longer patterns win over their prefixes.
fn apply_replacements(text: &str, replace: &HashMap<String, String>) -> String {
    let mut patterns: Vec<&str> = replace.keys().map(String::as_str).collect();
    patterns.retain(|pattern| !pattern.is_empty());
    if patterns.is_empty() {
        return text.to_string();
    }
    patterns.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = patterns
        .iter()
        .map(|pattern| regex::escape(pattern))
        .collect::<Vec<_>>()
        .join("|");
    let re = match Regex::new(&alternation) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("i18n-keyless: replacement regex failed to build: {}", e);
            return text.to_string();
        }
    };

    re.replace_all(text, |caps: &regex::Captures<'_>| {
        replace
            .get(&caps[0])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

//! End-to-End Integration Tests for the Translation Store
//!
//! These tests exercise the complete pipeline against the mock backend:
//! storage hydration, background translation through the queue,
//! on-disk persistence, and usage reporting.
//!
//! # Running the Live Test
//!
//! ```bash
//! export I18N_KEYLESS_API_KEY=...
//! cargo test --lib integration_tests -- --ignored --nocapture
//! ```

#[cfg(test)]
mod tests {
    use crate::*;
    use std::sync::Arc;
    use std::time::Duration;

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within 1s");
    }

    /// Skip test if API key not available
    fn require_api_key() -> bool {
        std::env::var("I18N_KEYLESS_API_KEY").is_ok()
    }

    fn config_with(
        backend: Arc<MockBackend>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> I18nKeylessConfig {
        let mut config =
            I18nKeylessConfig::new(LanguageConfig::new(Lang::En, vec![Lang::En, Lang::Fr]));
        config.with_storage(storage).with_backend(backend);
        config
    }

    // ============================================================================
    // TEST 1: Cache survives a restart
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_cache_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        // First run: a miss goes through the queue and the merged cache
        // lands on disk.
        {
            let backend = Arc::new(MockBackend::new(MockMode::Marker));
            let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
            let store = I18nKeyless::init(config_with(Arc::clone(&backend), storage))
                .await
                .unwrap();

            store.set_language(Lang::Fr).await;
            assert_eq!(store.translate("Hello"), "Hello");

            wait_until(|| store.translate("Hello") == "[fr] Hello").await;
            wait_until(|| store.is_idle()).await;
            // Let the drain refresh finish before the store goes away.
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        // Second run: the backend is unreachable, everything comes from
        // disk.
        {
            let backend = Arc::new(MockBackend::new(MockMode::Failure("offline".to_string())));
            let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
            let store = I18nKeyless::init(config_with(Arc::clone(&backend), storage))
                .await
                .unwrap();

            assert_eq!(store.current_language(), Lang::Fr);
            assert_eq!(store.translate("Hello"), "[fr] Hello");
            assert_eq!(backend.translate_calls(), 0);
        }
    }

    // ============================================================================
    // TEST 2: Concurrent lookups share one request
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_concurrent_lookups_share_one_request() {
        let backend = Arc::new(MockBackend::with_delay(MockMode::Marker, 30));
        let storage = Arc::new(MemoryStorage::new());
        let store = I18nKeyless::init(config_with(Arc::clone(&backend), storage))
            .await
            .unwrap();
        store.set_language(Lang::Fr).await;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.translate("Welcome") }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), "Welcome");
        }

        wait_until(|| backend.translate_calls() > 0 && store.is_idle()).await;
        assert_eq!(backend.translate_calls(), 1);
        wait_until(|| store.translate("Welcome") == "[fr] Welcome").await;
    }

    // ============================================================================
    // TEST 3: Full workflow demo
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_language_switch_workflow() {
        println!("\n{}", "=".repeat(80));
        println!("Workflow: init → switch language → translate → report usage");
        println!("{}", "=".repeat(80));

        let mut translations = Translations::new();
        for (key, value) in [("Sign in", "Se connecter"), ("Sign out", "Se déconnecter")] {
            translations
                .entry(Lang::Fr)
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        let backend =
            Arc::new(MockBackend::new(MockMode::Canned(translations)).with_unique_id("uid-e2e"));
        let storage = Arc::new(MemoryStorage::new());

        let store = I18nKeyless::init(config_with(Arc::clone(&backend), storage))
            .await
            .unwrap();
        println!("Initialized in {}", store.current_language());

        store.set_language(Lang::Fr).await;
        println!("Switched to {}", store.current_language());

        let sign_in = store.translate("Sign in");
        let sign_out = store.translate("Sign out");
        println!("'Sign in'  → {:?}", sign_in);
        println!("'Sign out' → {:?}", sign_out);
        assert_eq!(sign_in, "Se connecter");
        assert_eq!(sign_out, "Se déconnecter");
        assert_eq!(store.unique_id(), Some("uid-e2e".to_string()));

        store.flush_usage().await;
        assert_eq!(backend.usage_report_calls(), 1);
        let report = &backend.usage_reports()[0];
        assert!(report.translations_usage.contains_key("Sign in"));
        assert!(report.translations_usage.contains_key("Sign out"));
        println!(
            "Usage report delivered: {} keys",
            report.translations_usage.len()
        );
        println!("{}", "=".repeat(80));
    }

    // ============================================================================
    // TEST 4: Live service round trip
    // ============================================================================

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_live_service_round_trip() {
        if !require_api_key() {
            eprintln!("⚠️  Skipping: I18N_KEYLESS_API_KEY not set");
            return;
        }

        let mut config =
            I18nKeylessConfig::new(LanguageConfig::new(Lang::En, vec![Lang::En, Lang::Fr]));
        config
            .with_api_key(&std::env::var("I18N_KEYLESS_API_KEY").unwrap())
            .with_storage(Arc::new(MemoryStorage::new()));
        if let Ok(api_url) = std::env::var("I18N_KEYLESS_API_URL") {
            config.with_api_url(&api_url);
        }

        let store = I18nKeyless::init(config).await.expect("init failed");
        store.set_language(Lang::Fr).await;

        let first = store.translate("Hello from the integration suite");
        println!("First lookup: {:?}", first);

        for _ in 0..100 {
            if store.is_idle() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let second = store.translate("Hello from the integration suite");
        println!("After fetch:  {:?}", second);
        println!(
            "Cache size:   {}",
            store
                .translations()
                .values()
                .map(|map| map.len())
                .sum::<usize>()
        );
    }
}

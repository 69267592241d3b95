pub mod api;
pub mod config;
pub mod error;
pub mod mock;
pub mod queue;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod types;
pub mod usage;

mod integration_tests;

// Re-export the working surface for convenient access
pub use api::{DEFAULT_API_URL, HttpBackend, TranslationBackend};
pub use config::{I18nKeylessConfig, LanguageConfig};
pub use error::{I18nError, I18nResult};
pub use mock::{MockBackend, MockMode};
pub use queue::{DEFAULT_CONCURRENCY, TaskHandle, TaskQueue};
pub use resolver::TranslateOptions;
pub use storage::{
    FileStorage, KeyValueStorage, MemoryStorage, STORAGE_KEY_CURRENT_LANGUAGE,
    STORAGE_KEY_LAST_REFRESH, STORAGE_KEY_TRANSLATIONS, STORAGE_KEY_UNIQUE_ID,
};
pub use store::I18nKeyless;
pub use types::{
    AllTranslations, AllTranslationsResponse, Lang, LanguageTranslations,
    LanguageTranslationsResponse, TranslateOneResponse, TranslateRequest, TranslatedKey,
    TranslationMap, Translations, UsageReport, UsageReportResponse,
};
pub use usage::UsageLedger;

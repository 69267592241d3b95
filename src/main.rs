use clap::{Arg, Command};
use i18n_keyless::{
    FileStorage, I18nKeyless, I18nKeylessConfig, KeyValueStorage, Lang, LanguageConfig,
    MemoryStorage, MockBackend, MockMode, TranslateOptions,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("i18n-keyless")
        .version("0.1.0")
        .about("Translation cache CLI for the i18n-keyless service")
        .arg(
            Arg::new("key")
                .help("Text to translate, written in the primary language")
                .required_unless_present("list-languages")
                .index(1),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .short('l')
                .help("Target language code (e.g., fr, es, de)")
                .default_value("fr"),
        )
        .arg(
            Arg::new("primary")
                .long("primary")
                .help("Primary language the keys are written in")
                .default_value("en"),
        )
        .arg(
            Arg::new("context")
                .long("context")
                .short('c')
                .help("Disambiguation context for the key"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("API key (overrides the I18N_KEYLESS_API_KEY variable)"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Service endpoint (default: the hosted API)"),
        )
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .help("Directory for the persistent cache (default: in-memory)"),
        )
        .arg(
            Arg::new("refresh")
                .long("refresh")
                .help("Pull every stored translation before resolving")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock backend instead of the live service")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show store activity while translating")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-languages")
                .long("list-languages")
                .help("Print the supported language codes and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let directive = if verbose {
        "i18n_keyless=debug"
    } else {
        "i18n_keyless=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .init();

    if matches.get_flag("list-languages") {
        for lang in Lang::ALL {
            println!("{}", lang);
        }
        return Ok(());
    }

    let key = matches.get_one::<String>("key").unwrap();
    let target: Lang = matches.get_one::<String>("lang").unwrap().parse()?;
    let primary: Lang = matches.get_one::<String>("primary").unwrap().parse()?;

    let supported = if target == primary {
        vec![primary]
    } else {
        vec![primary, target]
    };
    let mut config = I18nKeylessConfig::new(LanguageConfig::new(primary, supported));

    // 1. Storage: on disk when asked for, in memory otherwise
    let storage: Arc<dyn KeyValueStorage> = match matches.get_one::<String>("storage-dir") {
        Some(dir) => Arc::new(FileStorage::new(dir)?),
        None => Arc::new(MemoryStorage::new()),
    };
    config.with_storage(storage);

    // 2. Backend: mock, or the live service
    if matches.get_flag("mock") {
        config.with_backend(Arc::new(MockBackend::new(MockMode::Marker)));
    } else {
        let api_url = matches.get_one::<String>("api-url");
        let api_key = matches
            .get_one::<String>("api-key")
            .cloned()
            .or_else(|| env::var("I18N_KEYLESS_API_KEY").ok());
        match api_key {
            Some(api_key) => {
                config.with_api_key(&api_key);
            }
            None if api_url.is_none() => {
                eprintln!("❌ I18N_KEYLESS_API_KEY environment variable not set");
                eprintln!("   Set it with: export I18N_KEYLESS_API_KEY=your_api_key");
                eprintln!("   Or use --mock to run the mock backend");
                return Err("Missing API key".into());
            }
            None => {}
        }
        if let Some(api_url) = api_url {
            config.with_api_url(api_url);
        }
    }

    // 3. Bring the store up and switch to the target language
    let store = I18nKeyless::init(config).await?;
    let resolved = store.set_language(target).await;
    if verbose {
        println!("🌍 {} → {}", primary, resolved);
    }

    if matches.get_flag("refresh") {
        store.refresh_all_languages().await?;
    }

    // 4. Resolve now, then wait out any background fetch it queued
    let mut options = TranslateOptions::new();
    if let Some(context) = matches.get_one::<String>("context") {
        options.with_context(context);
    }

    let immediate = store.translate_with(key, &options);
    if verbose {
        println!("📝 Immediate: \"{}\"", immediate);
    }
    while !store.is_idle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let translated = store.translate_with(key, &options);
    println!("{}", translated);

    if verbose {
        let cached: usize = store.translations().values().map(|map| map.len()).sum();
        println!("🔑 Cached translations: {}", cached);
        if let Some(unique_id) = store.unique_id() {
            println!("🆔 unique_id: {}", unique_id);
        }
    }

    Ok(())
}

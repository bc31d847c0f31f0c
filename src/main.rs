use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use sewerbot::bot::discord::{self, DiscordGateway};
use sewerbot::bot::stats::VERSION;
use sewerbot::bot::telegram::TelegramSink;
use sewerbot::bot::{BoilerplateFilter, BotEngine, ErrorLog, Notifier, StateRepository};
use sewerbot::config::Config;
use sewerbot::store::DocumentStore;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sewerbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    std::fs::create_dir_all(&config.log_dir).ok();
    let log_file = tracing_appender::rolling::never(&config.log_dir, "bot_logs.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("Starting sewerbot {VERSION}");
    if config.config_path.exists() {
        info!("Loaded config from {config_path}");
    } else {
        info!("No config at {config_path}, using defaults");
    }

    let store = DocumentStore::open(&config.data_dir);
    let mut repo = StateRepository::load(store, config.limits());
    repo.record_restart();

    let tokens = repo.tokens().clone();
    let filter = boilerplate_filter(&config, &repo.filter_patterns());
    info!("Boilerplate filter has {} patterns", filter.patterns().len());

    let sink = Arc::new(TelegramSink::new(
        &tokens.telegram_token,
        &tokens.telegram_chat_id,
    ));
    let notifier = Notifier::new(sink, config.retry_policy(), ErrorLog::new(&config.error_log));
    let gateway = Arc::new(DiscordGateway::new(&tokens.discord_token));

    let engine = Arc::new(BotEngine::new(
        repo,
        gateway,
        notifier,
        filter,
        config.engine(),
        StdRng::from_entropy(),
    ));

    if let Err(e) = discord::run(&tokens.discord_token, engine, config.recent_messages).await {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Built-in patterns, then the config file's, then the `filters` document's.
fn boilerplate_filter(config: &Config, document_patterns: &[String]) -> BoilerplateFilter {
    let from_document = document_patterns.iter().filter_map(|p| match Regex::new(p) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Skipping invalid filter pattern {p:?}: {e}");
            None
        }
    });
    BoilerplateFilter::with_extra(
        config
            .boilerplate_patterns
            .iter()
            .cloned()
            .chain(from_document),
    )
}

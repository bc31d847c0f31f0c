//! In-memory bot state backed by the document store.
//!
//! Loaded once at startup, mutated by the engine, and written back after
//! every change. Writes are best effort: when one fails the in-memory copy
//! stays authoritative and the next successful write catches the file up.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::bot::corpus::{CorpusState, MediaKind};
use crate::bot::stats::{Direction, MessageKind, Statistics};
use crate::store::{DocumentName, DocumentStore, is_empty};

/// Credentials. Empty strings mean "not configured yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    #[serde(rename = "DISCORD_TOKEN", default)]
    pub discord_token: String,
    #[serde(rename = "TELEGRAM_TOKEN", default)]
    pub telegram_token: String,
    #[serde(rename = "TELEGRAM_CHAT_ID", default)]
    pub telegram_chat_id: String,
}

impl Tokens {
    pub fn is_complete(&self) -> bool {
        !self.discord_token.is_empty()
            && !self.telegram_token.is_empty()
            && !self.telegram_chat_id.is_empty()
    }
}

/// Size caps for the corpus window and the media lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_corpus_words: usize,
    pub max_media: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_corpus_words: 1000,
            max_media: 50,
        }
    }
}

#[derive(Deserialize, Default)]
struct FiltersDocument {
    #[serde(default)]
    boilerplate_patterns: Vec<String>,
}

pub struct StateRepository {
    store: DocumentStore,
    limits: Limits,
    tokens: Tokens,
    corpus: CorpusState,
    stats: Statistics,
    started: Instant,
}

impl StateRepository {
    /// Load all state, writing defaults for documents that are absent.
    pub fn load(store: DocumentStore, limits: Limits) -> Self {
        let tokens = load_or_init::<Tokens>(&store, DocumentName::Tokens);
        let mut corpus = load_or_init::<CorpusState>(&store, DocumentName::BotData);
        let stats = load_or_init::<Statistics>(&store, DocumentName::Stats);

        // Caps may have shrunk since the documents were written.
        corpus.truncate(limits.max_corpus_words);
        corpus.cap_media(limits.max_media);

        if !tokens.is_complete() {
            warn!("Tokens are not fully configured in {}", store.path(DocumentName::Tokens).display());
        }
        info!(
            "Loaded state: {} corpus words, {} images, {} gifs, {} restarts",
            corpus.word_count(),
            corpus.static_images.len(),
            corpus.gifs.len(),
            stats.general.restarts
        );

        Self {
            store,
            limits,
            tokens,
            corpus,
            stats,
            started: Instant::now(),
        }
    }

    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    pub fn corpus(&self) -> &CorpusState {
        &self.corpus
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Extra boilerplate patterns from the `filters` document.
    pub fn filter_patterns(&self) -> Vec<String> {
        self.store
            .load_as::<FiltersDocument>(DocumentName::Filters)
            .boilerplate_patterns
    }

    pub fn append_text(&mut self, normalized: &str) {
        self.corpus.append_text(normalized, self.limits.max_corpus_words);
    }

    pub fn append_media(&mut self, kind: MediaKind, url: String) {
        self.corpus.append_media(kind, url, self.limits.max_media);
    }

    /// Write corpus, tokens and statistics. True only if all three succeed.
    pub fn persist(&self) -> bool {
        let corpus = self.persist_corpus();
        let tokens = self.store.save_as(DocumentName::Tokens, &self.tokens);
        let stats = self.persist_stats();
        corpus && tokens && stats
    }

    pub fn persist_corpus(&self) -> bool {
        let ok = self.store.save_as(DocumentName::BotData, &self.corpus);
        if !ok {
            warn!("Corpus not saved, keeping in-memory copy");
        }
        ok
    }

    pub fn persist_stats(&self) -> bool {
        let ok = self.store.save_as(DocumentName::Stats, &self.stats);
        if !ok {
            warn!("Statistics not saved, keeping in-memory copy");
        }
        ok
    }

    /// Count a message against today's local date and save the statistics.
    pub fn record_message(&mut self, kind: MessageKind, direction: Direction) {
        let today = Local::now().date_naive();
        let uptime = self.started.elapsed().as_secs();
        self.stats.record(kind, direction, today, uptime);
        self.persist_stats();
    }

    /// Called once per process start before any event is handled.
    pub fn record_restart(&mut self) {
        self.stats.record_restart();
        info!("Restart #{}", self.stats.general.restarts);
        self.persist_stats();
    }
}

fn load_or_init<T>(store: &DocumentStore, name: DocumentName) -> T
where
    T: Serialize + serde::de::DeserializeOwned + Default,
{
    if is_empty(&store.load(name)) {
        let value = T::default();
        info!("Initializing {name} with defaults");
        store.save_as(name, &value);
        value
    } else {
        store.load_as(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo_in(dir: &std::path::Path) -> StateRepository {
        StateRepository::load(DocumentStore::open(dir), Limits::default())
    }

    #[test]
    fn test_defaults_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(dir.path());
        let store = repo.store();

        assert_eq!(
            store.load(DocumentName::Tokens),
            json!({"DISCORD_TOKEN": "", "TELEGRAM_TOKEN": "", "TELEGRAM_CHAT_ID": ""})
        );
        assert_eq!(
            store.load(DocumentName::BotData),
            json!({"text_corpus": "", "static_images": [], "gifs": []})
        );
        let stats = store.load(DocumentName::Stats);
        assert_eq!(stats["general"]["restarts"], 0);
        assert_eq!(stats["general"]["version"], "1.0.0");
        assert!(stats["messages"]["by_day"].as_object().unwrap().is_empty());
        // Reserved documents are left alone.
        assert!(!store.path(DocumentName::Commands).exists());
    }

    #[test]
    fn test_existing_tokens_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path());
        store.save(DocumentName::Tokens, &json!({"DISCORD_TOKEN": "abc"}));

        let repo = repo_in(dir.path());
        assert_eq!(repo.tokens().discord_token, "abc");
        assert_eq!(repo.tokens().telegram_token, "");
        assert!(!repo.tokens().is_complete());
    }

    #[test]
    fn test_restart_counter_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut repo = repo_in(dir.path());
            repo.record_restart();
        }
        let mut repo = repo_in(dir.path());
        assert_eq!(repo.stats().general.restarts, 1);
        repo.record_restart();
        assert_eq!(repo.stats().general.restarts, 2);
    }

    #[test]
    fn test_record_message_counts_today() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = repo_in(dir.path());
        repo.record_message(MessageKind::Text, Direction::Received);
        repo.record_message(MessageKind::Gif, Direction::Sent);

        let today = Local::now().format("%Y-%m-%d").to_string();
        let saved = repo.store().load(DocumentName::Stats);
        assert_eq!(saved["messages"]["by_day"][&today], 2);
        assert_eq!(saved["messages"]["total_received"], 1);
        assert_eq!(saved["messages"]["total_sent"], 1);
        assert_eq!(saved["messages"]["by_type"]["gif"], 1);
    }

    #[test]
    fn test_persist_failure_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = repo_in(dir.path());
        std::fs::remove_dir_all(dir.path()).unwrap();

        repo.append_text("still here");
        assert!(!repo.persist());
        assert_eq!(repo.corpus().words(), vec!["still", "here"]);
    }

    #[test]
    fn test_load_applies_smaller_caps() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path());
        let images: Vec<String> = (0..5).map(|i| format!("img{i}.png")).collect();
        store.save(
            DocumentName::BotData,
            &json!({"text_corpus": "a b c d e ", "static_images": images, "gifs": []}),
        );

        let repo = StateRepository::load(
            store,
            Limits { max_corpus_words: 3, max_media: 2 },
        );
        assert_eq!(repo.corpus().words(), vec!["c", "d", "e"]);
        assert_eq!(
            repo.corpus().static_images.iter().collect::<Vec<_>>(),
            vec!["img3.png", "img4.png"]
        );
    }

    #[test]
    fn test_filter_patterns_from_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path());
        store.save(DocumentName::Filters, &json!({"boilerplate_patterns": ["\\bку\\b"]}));
        let repo = repo_in(dir.path());
        assert_eq!(repo.filter_patterns(), vec!["\\bку\\b".to_string()]);
    }
}

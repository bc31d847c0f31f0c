//! JSON document store.
//!
//! Every piece of persistent state lives in a named JSON file under one
//! directory. Loading never fails: a missing file or a broken one comes back
//! as an empty object so the bot can always start.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Names of the documents kept by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentName {
    Tokens,
    BotData,
    Responses,
    Personality,
    Filters,
    Commands,
    Stats,
    LearningConfig,
    Scheduler,
}

impl DocumentName {
    pub const ALL: [DocumentName; 9] = [
        DocumentName::Tokens,
        DocumentName::BotData,
        DocumentName::Responses,
        DocumentName::Personality,
        DocumentName::Filters,
        DocumentName::Commands,
        DocumentName::Stats,
        DocumentName::LearningConfig,
        DocumentName::Scheduler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentName::Tokens => "tokens",
            DocumentName::BotData => "bot_data",
            DocumentName::Responses => "responses",
            DocumentName::Personality => "personality",
            DocumentName::Filters => "filters",
            DocumentName::Commands => "commands",
            DocumentName::Stats => "stats",
            DocumentName::LearningConfig => "learning_config",
            DocumentName::Scheduler => "scheduler",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl std::fmt::Display for DocumentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory of JSON documents.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            error!("Failed to create document dir {}: {e}", dir.display());
        }
        Self { dir }
    }

    pub fn path(&self, name: DocumentName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    /// Load a document. Missing or malformed files yield `{}`.
    pub fn load(&self, name: DocumentName) -> Value {
        let path = self.path(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Document {} not found, will be created on save", path.display());
                return empty();
            }
            Err(e) => {
                error!("Failed to read {}: {e}", path.display());
                return empty();
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to decode JSON in {}: {e}", path.display());
                empty()
            }
        }
    }

    /// Save a document with 4-space indentation. Returns false on failure.
    pub fn save(&self, name: DocumentName, value: &Value) -> bool {
        let path = self.path(name);
        match write_pretty(&path, value) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save {}: {e}", path.display());
                false
            }
        }
    }

    /// Load a document into a typed value, falling back to the default when
    /// the stored shape does not match.
    pub fn load_as<T: DeserializeOwned + Default>(&self, name: DocumentName) -> T {
        let value = self.load(name);
        if is_empty(&value) {
            return T::default();
        }
        match serde_json::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                error!("Document {name} has an unexpected shape: {e}");
                T::default()
            }
        }
    }

    pub fn save_as<T: Serialize>(&self, name: DocumentName, data: &T) -> bool {
        match serde_json::to_value(data) {
            Ok(value) => self.save(name, &value),
            Err(e) => {
                error!("Failed to serialize {name}: {e}");
                false
            }
        }
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}

/// True for `{}`, `[]`, `null` and `""`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn write_pretty(path: &Path, value: &Value) -> Result<(), String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| format!("Failed to serialize: {e}"))?;
    std::fs::write(path, buf).map_err(|e| format!("Failed to write: {e}"))
}

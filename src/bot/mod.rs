//! Bot domain - corpus, reply generation and activity mirroring.

pub mod corpus;
pub mod discord;
pub mod engine;
pub mod generator;
pub mod markov;
pub mod message;
pub mod notify;
pub mod recent;
pub mod repository;
pub mod stats;
pub mod telegram;
pub mod text;


pub use corpus::{CorpusState, MediaKind};
pub use engine::{BotEngine, EngineConfig, MessagingGateway};
pub use generator::{GeneratorConfig, Response};
pub use message::{Attachment, Author, InboundEvent, IncomingMessage};
pub use notify::{ErrorLog, NotificationSink, Notifier, RetryPolicy};
pub use repository::{Limits, StateRepository, Tokens};
pub use stats::Statistics;
pub use text::BoilerplateFilter;

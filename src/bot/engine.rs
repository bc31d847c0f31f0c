//! Event orchestrator: corpus growth, replies on mention, activity mirroring.

use async_trait::async_trait;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bot::generator::{GeneratorConfig, INSUFFICIENT_DATA, Response, respond};
use crate::bot::message::{
    Attachment, AuditQuery, InboundEvent, IncomingMessage, other_attachment_line, received_line,
};
use crate::bot::notify::{Notifier, retry};
use crate::bot::repository::StateRepository;
use crate::bot::stats::{Direction, MessageKind};
use crate::bot::text::{BoilerplateFilter, clean_for_corpus};

/// The chat platform, as far as the engine needs it.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), String>;

    /// Download an attachment to `dest`.
    async fn save_attachment(&self, attachment: &Attachment, dest: &Path) -> Result<(), String>;

    /// Name of the user responsible for the change, if the audit log says so.
    async fn audit_actor(&self, query: AuditQuery) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub generator: GeneratorConfig,
    /// Where attachments are downloaded. System temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

struct EngineState {
    repo: StateRepository,
    rng: StdRng,
}

pub struct BotEngine {
    state: Mutex<EngineState>,
    gateway: Arc<dyn MessagingGateway>,
    notifier: Notifier,
    filter: BoilerplateFilter,
    config: EngineConfig,
    bot_user_id: OnceLock<u64>,
}

impl BotEngine {
    pub fn new(
        repo: StateRepository,
        gateway: Arc<dyn MessagingGateway>,
        notifier: Notifier,
        filter: BoilerplateFilter,
        config: EngineConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState { repo, rng }),
            gateway,
            notifier,
            filter,
            config,
            bot_user_id: OnceLock::new(),
        }
    }

    /// Set once the gateway knows who we are. Later calls are ignored.
    pub fn set_bot_user(&self, user_id: u64) {
        if self.bot_user_id.set(user_id).is_err() {
            debug!("Bot user already set, ignoring {user_id}");
        }
    }

    pub fn bot_user_id(&self) -> Option<u64> {
        self.bot_user_id.get().copied()
    }

    /// Read access to the state between events.
    pub async fn with_repo<T>(&self, f: impl FnOnce(&StateRepository) -> T) -> T {
        let state = self.state.lock().await;
        f(&state.repo)
    }

    /// Process one event to completion. Events are serialized on the state lock.
    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::MessageReceived(msg) => self.handle_message(msg).await,
            other => self.handle_activity(other).await,
        }
    }

    async fn handle_message(&self, msg: IncomingMessage) {
        let bot_id = self.bot_user_id();
        if bot_id == Some(msg.author.id) {
            return;
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if !msg.author.is_bot {
            self.mirror(&received_line(&msg)).await;
            state.repo.record_message(MessageKind::Text, Direction::Received);

            for attachment in &msg.attachments {
                self.handle_attachment(&mut state.repo, &msg.author.name, attachment)
                    .await;
            }
        }

        match clean_for_corpus(&msg.content, &self.filter) {
            Some(text) => state.repo.append_text(&text),
            None => debug!("Message {} not added to corpus", msg.message_id),
        }
        state.repo.persist_corpus();

        if let Some(bot_id) = bot_id
            && msg.mentions_user(bot_id)
        {
            self.reply(state, &msg).await;
        }
    }

    async fn handle_attachment(&self, repo: &mut StateRepository, author: &str, attachment: &Attachment) {
        let Some(media) = attachment.kind().media() else {
            self.mirror(&other_attachment_line(author, &attachment.url)).await;
            return;
        };

        repo.append_media(media, attachment.url.clone());
        if let Err(e) = self.forward_attachment(attachment).await {
            warn!("Attachment {} not forwarded: {e}", attachment.filename);
        }
        repo.record_message(media.into(), Direction::Received);
    }

    /// Download into a temp file and pass it on. The file is removed on drop.
    async fn forward_attachment(&self, attachment: &Attachment) -> Result<(), String> {
        let file = self.temp_file(&attachment.filename)?;
        retry(self.notifier.policy(), "Attachment download", || {
            self.gateway.save_attachment(attachment, file.path())
        })
        .await?;
        self.notifier.send_image(file.path()).await
    }

    fn temp_file(&self, filename: &str) -> Result<NamedTempFile, String> {
        let suffix = Path::new(filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut builder = tempfile::Builder::new();
        builder.prefix("attachment-").suffix(&suffix);
        match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| format!("Failed to create temp file: {e}"))
    }

    async fn reply(&self, state: &mut EngineState, msg: &IncomingMessage) {
        let generator = &self.config.generator;
        let corpus = state.repo.corpus();
        if corpus.word_count() < generator.min_corpus_words && !corpus.has_media() {
            info!("Mentioned by {} with too little data", msg.author.name);
            if let Err(e) = self.gateway.send_text(msg.channel_id, INSUFFICIENT_DATA).await {
                warn!("Failed to send reply: {e}");
            }
            return;
        }

        let response = respond(&mut state.rng, state.repo.corpus(), generator);
        if let Err(e) = self.gateway.send_text(msg.channel_id, response.content()).await {
            warn!("Failed to send reply: {e}");
            return;
        }

        let (kind, line) = describe_reply(&msg.author.name, &response);
        info!("{line}");
        self.mirror(&line).await;
        state.repo.record_message(kind, Direction::Sent);
    }

    async fn handle_activity(&self, event: InboundEvent) {
        let _guard = self.state.lock().await;

        if event.activity_line(None).is_none() {
            return;
        }
        let actor = match event.audit_query() {
            Some(query) => self.gateway.audit_actor(query).await,
            None => None,
        };
        if let Some(line) = event.activity_line(actor.as_deref()) {
            self.mirror(&line).await;
        }
    }

    /// Failures are logged by the notifier and never stop the event.
    async fn mirror(&self, line: &str) {
        let _ = self.notifier.send_text(line).await;
    }
}

fn describe_reply(author: &str, response: &Response) -> (MessageKind, String) {
    match response {
        Response::Text(_) | Response::InsufficientData => (
            MessageKind::Text,
            format!("Бот ответил {author}: {}", response.content()),
        ),
        Response::StaticImage(url) => (
            MessageKind::Image,
            format!("Бот ответил {author} картинкой: {url}"),
        ),
        Response::Gif(url) => (MessageKind::Gif, format!("Бот ответил {author} GIF: {url}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_reply() {
        assert_eq!(
            describe_reply("oleg", &Response::Text("ну да".into())),
            (MessageKind::Text, "Бот ответил oleg: ну да".to_string())
        );
        assert_eq!(
            describe_reply("oleg", &Response::StaticImage("https://cdn/a.png".into())),
            (MessageKind::Image, "Бот ответил oleg картинкой: https://cdn/a.png".to_string())
        );
        assert_eq!(
            describe_reply("oleg", &Response::Gif("https://cdn/a.gif".into())),
            (MessageKind::Gif, "Бот ответил oleg GIF: https://cdn/a.gif".to_string())
        );
        assert_eq!(
            describe_reply("oleg", &Response::InsufficientData).1,
            format!("Бот ответил oleg: {INSUFFICIENT_DATA}")
        );
    }
}

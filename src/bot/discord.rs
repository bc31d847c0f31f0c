//! Discord adapter using serenity.
//!
//! `DiscordGateway` is what the engine talks back through. `DiscordHandler`
//! turns serenity events into `InboundEvent`s. Serenity only reports ids for
//! deletes, so the handler keeps its own buffer of recent messages to know
//! who wrote what.

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, Client, Context, EventHandler, GatewayIntents, GuildChannel, GuildId,
    GuildMemberUpdateEvent, Http, Member, Message, MessageId, MessageUpdateEvent, Ready, User,
    VoiceState,
};
use serenity::model::guild::audit_log::{Action, Change, ChannelAction, MemberAction};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bot::engine::{BotEngine, MessagingGateway};
use crate::bot::message::{
    Attachment, AuditAction, AuditQuery, Author, ChannelKind, InboundEvent, IncomingMessage,
    VoiceChannel,
};
use crate::bot::recent::RecentMessages;

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MEMBERS
}

/// Outbound side: replies, attachment downloads, audit lookups.
pub struct DiscordGateway {
    http: Arc<Http>,
    client: reqwest::Client,
}

impl DiscordGateway {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessagingGateway for DiscordGateway {
    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), String> {
        ChannelId::new(channel_id)
            .say(&*self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send to channel {channel_id}: {e}"))
    }

    async fn save_attachment(&self, attachment: &Attachment, dest: &Path) -> Result<(), String> {
        let bytes = self
            .client
            .get(&attachment.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("Failed to download {}: {e}", attachment.url))?
            .bytes()
            .await
            .map_err(|e| format!("Failed to read {}: {e}", attachment.url))?;

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", dest.display()))?;
        debug!("Saved {} ({} bytes)", attachment.filename, bytes.len());
        Ok(())
    }

    async fn audit_actor(&self, query: AuditQuery) -> Option<String> {
        let action = match query.action {
            AuditAction::MemberUpdate => Action::Member(MemberAction::Update),
            AuditAction::ChannelUpdate => Action::Channel(ChannelAction::Update),
            AuditAction::ChannelDelete => Action::Channel(ChannelAction::Delete),
        };
        let logs = match GuildId::new(query.guild_id)
            .audit_logs(&*self.http, Some(action), None, None, Some(1))
            .await
        {
            Ok(logs) => logs,
            Err(e) => {
                // Usually a missing View Audit Log permission.
                debug!("Audit log unavailable: {e}");
                return None;
            }
        };

        let actor = logs
            .entries
            .iter()
            .find(|e| {
                e.target_id.map(|t| t.get()) == Some(query.target_id)
                    && records_change(query.action, e.changes.as_deref().unwrap_or_default())
            })?
            .user_id;
        match actor.to_user(&*self.http).await {
            Ok(user) => Some(user.name),
            Err(e) => {
                debug!("Failed to resolve audit user {actor}: {e}");
                None
            }
        }
    }
}

/// Whether an audit entry's changes are the ones the event reported.
/// A member update that only touched roles must not be credited for a nick change.
fn records_change(action: AuditAction, changes: &[Change]) -> bool {
    match action {
        AuditAction::MemberUpdate => changes
            .iter()
            .any(|c| matches!(c, Change::Nick { old, new } if old != new)),
        AuditAction::ChannelUpdate => changes
            .iter()
            .any(|c| matches!(c, Change::Name { old, new } if old != new)),
        AuditAction::ChannelDelete => true,
    }
}

fn to_author(user: &User) -> Author {
    Author {
        id: user.id.get(),
        name: user.name.clone(),
        is_bot: user.bot,
    }
}

fn incoming_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author: to_author(&msg.author),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                url: a.url.clone(),
                filename: a.filename.clone(),
            })
            .collect(),
        mentions: msg.mentions.iter().map(|u| u.id.get()).collect(),
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text | ChannelType::News => ChannelKind::Text,
        ChannelType::Voice | ChannelType::Stage => ChannelKind::Voice,
        _ => ChannelKind::Other,
    }
}

async fn voice_channel(ctx: &Context, channel_id: Option<ChannelId>) -> Option<VoiceChannel> {
    let id = channel_id?;
    let name = match id.name(ctx).await {
        Ok(name) => name,
        Err(e) => {
            debug!("Channel {id} name unavailable: {e}");
            id.to_string()
        }
    };
    Some(VoiceChannel { id: id.get(), name })
}

struct DiscordHandler {
    engine: Arc<BotEngine>,
    recent: Mutex<RecentMessages>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} has connected to Discord!", ready.user.name);
        self.engine.set_bot_user(ready.user.id.get());
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let incoming = incoming_message(&msg);
        self.recent.lock().await.add(
            incoming.message_id,
            incoming.author.clone(),
            incoming.content.clone(),
        );
        self.engine.handle(InboundEvent::MessageReceived(incoming)).await;
    }

    async fn message_delete(
        &self,
        _ctx: Context,
        _channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        let Some(msg) = self.recent.lock().await.remove(deleted_message_id.get()) else {
            debug!("Deleted message {deleted_message_id} was not seen");
            return;
        };
        self.engine
            .handle(InboundEvent::MessageDeleted {
                author: msg.author,
                content: msg.content,
            })
            .await;
    }

    async fn message_update(
        &self,
        _ctx: Context,
        old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some(after) = new.map(|m| m.content).or(event.content) else {
            // Embed-only updates carry no content.
            return;
        };
        let known = self.recent.lock().await.edit(event.id.get(), &after);
        let (author, before) = match (known, old_if_available) {
            (Some(msg), _) => (msg.author, msg.content),
            (None, Some(old)) => (to_author(&old.author), old.content),
            (None, None) => {
                debug!("Edited message {} was not seen", event.id);
                return;
            }
        };
        self.engine
            .handle(InboundEvent::MessageEdited { author, before, after })
            .await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let member = match &new.member {
            Some(m) => m.user.name.clone(),
            None => match new.user_id.to_user(&ctx).await {
                Ok(user) => user.name,
                Err(e) => {
                    warn!("Failed to resolve voice user {}: {e}", new.user_id);
                    new.user_id.to_string()
                }
            },
        };
        let before = voice_channel(&ctx, old.and_then(|o| o.channel_id)).await;
        let after = voice_channel(&ctx, new.channel_id).await;
        self.engine
            .handle(InboundEvent::VoiceStateChanged { member, before, after })
            .await;
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        old_if_available: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        let Some(old) = old_if_available else {
            debug!("No cached member for {}", event.user.name);
            return;
        };
        self.engine
            .handle(InboundEvent::MemberUpdated {
                guild_id: event.guild_id.get(),
                user_id: event.user.id.get(),
                username: event.user.name.clone(),
                old_nick: old.nick,
                new_nick: event.nick,
            })
            .await;
    }

    async fn channel_update(&self, _ctx: Context, old: Option<GuildChannel>, new: GuildChannel) {
        let Some(old) = old else {
            debug!("No cached channel for {}", new.name);
            return;
        };
        self.engine
            .handle(InboundEvent::ChannelUpdated {
                guild_id: new.guild_id.get(),
                channel_id: new.id.get(),
                kind: channel_kind(new.kind),
                old_name: old.name,
                new_name: new.name,
            })
            .await;
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        self.engine
            .handle(InboundEvent::ChannelDeleted {
                guild_id: channel.guild_id.get(),
                channel_id: channel.id.get(),
                kind: channel_kind(channel.kind),
                name: channel.name,
            })
            .await;
    }
}

/// Connect and dispatch events until the client stops.
pub async fn run(token: &str, engine: Arc<BotEngine>, recent_messages: usize) -> Result<(), String> {
    let handler = DiscordHandler {
        engine,
        recent: Mutex::new(RecentMessages::new(recent_messages)),
    };
    let mut client = Client::builder(token, intents())
        .event_handler(handler)
        .await
        .map_err(|e| format!("Failed to create Discord client: {e}"))?;

    client
        .start()
        .await
        .map_err(|e| format!("Discord client error: {e}"))
}

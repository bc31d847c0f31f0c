//! Platform-neutral inbound events and the activity lines mirrored for them.

use serde::{Deserialize, Serialize};

use crate::bot::corpus::MediaKind;

/// Who wrote something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub name: String,
    /// Automated accounts (other bots, webhooks).
    pub is_bot: bool,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Gif,
    Other,
}

impl AttachmentKind {
    pub fn media(self) -> Option<MediaKind> {
        match self {
            AttachmentKind::Image => Some(MediaKind::StaticImage),
            AttachmentKind::Gif => Some(MediaKind::Gif),
            AttachmentKind::Other => None,
        }
    }
}

impl Attachment {
    /// Classify by the extension of the URL path (query and fragment ignored).
    pub fn kind(&self) -> AttachmentKind {
        let path = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if path.ends_with(".png") || path.ends_with(".jpg") || path.ends_with(".jpeg") {
            AttachmentKind::Image
        } else if path.ends_with(".gif") {
            AttachmentKind::Gif
        } else {
            AttachmentKind::Other
        }
    }
}

/// A chat message as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub author: Author,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// User ids mentioned in the message.
    #[serde(default)]
    pub mentions: Vec<u64>,
}

impl IncomingMessage {
    pub fn mentions_user(&self, user_id: u64) -> bool {
        self.mentions.contains(&user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Other,
}

impl ChannelKind {
    fn label(self) -> &'static str {
        match self {
            ChannelKind::Text => "Текстовый",
            ChannelKind::Voice => "Голосовой",
            ChannelKind::Other => "Прочий",
        }
    }
}

/// What kind of change an audit log lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    MemberUpdate,
    ChannelUpdate,
    ChannelDelete,
}

/// Everything the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    MessageReceived(IncomingMessage),
    MessageDeleted {
        author: Author,
        content: String,
    },
    MessageEdited {
        author: Author,
        before: String,
        after: String,
    },
    VoiceStateChanged {
        member: String,
        before: Option<VoiceChannel>,
        after: Option<VoiceChannel>,
    },
    MemberUpdated {
        guild_id: u64,
        user_id: u64,
        username: String,
        old_nick: Option<String>,
        new_nick: Option<String>,
    },
    ChannelUpdated {
        guild_id: u64,
        channel_id: u64,
        kind: ChannelKind,
        old_name: String,
        new_name: String,
    },
    ChannelDeleted {
        guild_id: u64,
        channel_id: u64,
        kind: ChannelKind,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChannel {
    pub id: u64,
    pub name: String,
}

/// An audit log question attached to an event: who did this?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditQuery {
    pub guild_id: u64,
    pub target_id: u64,
    pub action: AuditAction,
}

impl InboundEvent {
    /// The audit lookup that would name the responsible user, if any.
    pub fn audit_query(&self) -> Option<AuditQuery> {
        match self {
            InboundEvent::MemberUpdated { guild_id, user_id, .. } => Some(AuditQuery {
                guild_id: *guild_id,
                target_id: *user_id,
                action: AuditAction::MemberUpdate,
            }),
            InboundEvent::ChannelUpdated { guild_id, channel_id, .. } => Some(AuditQuery {
                guild_id: *guild_id,
                target_id: *channel_id,
                action: AuditAction::ChannelUpdate,
            }),
            InboundEvent::ChannelDeleted { guild_id, channel_id, .. } => Some(AuditQuery {
                guild_id: *guild_id,
                target_id: *channel_id,
                action: AuditAction::ChannelDelete,
            }),
            _ => None,
        }
    }

    /// The activity line for a side-channel event. `None` when there is
    /// nothing to report (bot authors, no actual change, chat messages).
    pub fn activity_line(&self, actor: Option<&str>) -> Option<String> {
        let line = match self {
            InboundEvent::MessageReceived(_) => return None,
            InboundEvent::MessageDeleted { author, content } => {
                if author.is_bot {
                    return None;
                }
                format!("Сообщение от {} было удалено: {}", author.name, content)
            }
            InboundEvent::MessageEdited { author, before, after } => {
                if author.is_bot || before == after {
                    return None;
                }
                format!(
                    "Сообщение от {} было отредактировано.\nСтарое: {}\nНовое: {}",
                    author.name, before, after
                )
            }
            InboundEvent::VoiceStateChanged { member, before, after } => match (before, after) {
                (None, Some(to)) => format!("{} зашел в голосовой канал {}", member, to.name),
                (Some(from), None) => format!("{} вышел из голосового канала {}", member, from.name),
                (Some(from), Some(to)) if from.id != to.id => {
                    format!("{} перешел из {} в {}", member, from.name, to.name)
                }
                _ => return None,
            },
            InboundEvent::MemberUpdated { username, old_nick, new_nick, .. } => {
                if old_nick == new_nick {
                    return None;
                }
                format!(
                    "Никнейм пользователя {} изменен: {} -> {}",
                    username,
                    old_nick.as_deref().unwrap_or(username),
                    new_nick.as_deref().unwrap_or(username)
                )
            }
            InboundEvent::ChannelUpdated { kind, old_name, new_name, .. } => {
                if old_name == new_name {
                    return None;
                }
                format!("{} канал изменен: {} -> {}", kind.label(), old_name, new_name)
            }
            InboundEvent::ChannelDeleted { kind, name, .. } => {
                format!("{} канал {} был удален", kind.label(), name)
            }
        };

        let suffix = match (self, actor) {
            (InboundEvent::ChannelDeleted { .. }, Some(actor)) => {
                format!(" (удалено пользователем {actor})")
            }
            (_, Some(actor)) => format!(" (изменено пользователем {actor})"),
            (_, None) => String::new(),
        };
        Some(line + &suffix)
    }
}

/// Mirror line for a received chat message.
pub fn received_line(msg: &IncomingMessage) -> String {
    format!("Сообщение от {}: {}", msg.author.name, msg.content)
}

/// Mirror line for an attachment that is not an image.
pub fn other_attachment_line(author: &str, url: &str) -> String {
    format!("Вложение от {author}: {url} (не изображение)")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: &str, is_bot: bool) -> Author {
        Author {
            id: 1,
            name: name.to_string(),
            is_bot,
        }
    }

    fn attachment(url: &str) -> Attachment {
        Attachment {
            url: url.to_string(),
            filename: "f".to_string(),
        }
    }

    fn voice(id: u64, name: &str) -> Option<VoiceChannel> {
        Some(VoiceChannel { id, name: name.to_string() })
    }

    #[test]
    fn test_attachment_kinds() {
        assert_eq!(attachment("https://cdn/a.PNG").kind(), AttachmentKind::Image);
        assert_eq!(attachment("https://cdn/a.jpeg?ex=1&is=2").kind(), AttachmentKind::Image);
        assert_eq!(attachment("https://cdn/a.jpg#frag").kind(), AttachmentKind::Image);
        assert_eq!(attachment("https://cdn/a.gif").kind(), AttachmentKind::Gif);
        assert_eq!(attachment("https://cdn/a.mp4").kind(), AttachmentKind::Other);
        assert_eq!(attachment("https://cdn/gif").kind(), AttachmentKind::Other);
        assert_eq!(AttachmentKind::Gif.media(), Some(MediaKind::Gif));
        assert_eq!(AttachmentKind::Other.media(), None);
    }

    #[test]
    fn test_received_line() {
        let msg = IncomingMessage {
            message_id: 1,
            channel_id: 2,
            author: author("vasya", false),
            content: "всем ку".to_string(),
            attachments: vec![],
            mentions: vec![42],
        };
        assert_eq!(received_line(&msg), "Сообщение от vasya: всем ку");
        assert!(msg.mentions_user(42));
        assert!(!msg.mentions_user(43));
    }

    #[test]
    fn test_deleted_and_edited_lines() {
        let deleted = InboundEvent::MessageDeleted {
            author: author("petya", false),
            content: "oops".to_string(),
        };
        assert_eq!(
            deleted.activity_line(None).as_deref(),
            Some("Сообщение от petya было удалено: oops")
        );

        let edited = InboundEvent::MessageEdited {
            author: author("petya", false),
            before: "a".to_string(),
            after: "b".to_string(),
        };
        assert_eq!(
            edited.activity_line(None).as_deref(),
            Some("Сообщение от petya было отредактировано.\nСтарое: a\nНовое: b")
        );

        let bot_delete = InboundEvent::MessageDeleted {
            author: author("robot", true),
            content: "x".to_string(),
        };
        assert_eq!(bot_delete.activity_line(None), None);
    }

    #[test]
    fn test_edit_without_text_change_is_silent() {
        // Pins and embed refreshes arrive as edits with identical content.
        let pinned = InboundEvent::MessageEdited {
            author: author("petya", false),
            before: "same".to_string(),
            after: "same".to_string(),
        };
        assert_eq!(pinned.activity_line(None), None);
    }

    #[test]
    fn test_voice_lines() {
        let join = InboundEvent::VoiceStateChanged {
            member: "kolya".into(),
            before: None,
            after: voice(1, "Общий"),
        };
        assert_eq!(join.activity_line(None).as_deref(), Some("kolya зашел в голосовой канал Общий"));

        let leave = InboundEvent::VoiceStateChanged {
            member: "kolya".into(),
            before: voice(1, "Общий"),
            after: None,
        };
        assert_eq!(leave.activity_line(None).as_deref(), Some("kolya вышел из голосового канала Общий"));

        let moved = InboundEvent::VoiceStateChanged {
            member: "kolya".into(),
            before: voice(1, "Общий"),
            after: voice(2, "Игры"),
        };
        assert_eq!(moved.activity_line(None).as_deref(), Some("kolya перешел из Общий в Игры"));

        let mute = InboundEvent::VoiceStateChanged {
            member: "kolya".into(),
            before: voice(1, "Общий"),
            after: voice(1, "Общий"),
        };
        assert_eq!(mute.activity_line(None), None);
    }

    #[test]
    fn test_member_nick_line_with_actor() {
        let event = InboundEvent::MemberUpdated {
            guild_id: 9,
            user_id: 5,
            username: "masha".into(),
            old_nick: None,
            new_nick: Some("Мария".into()),
        };
        assert_eq!(
            event.activity_line(Some("admin")).as_deref(),
            Some("Никнейм пользователя masha изменен: masha -> Мария (изменено пользователем admin)")
        );
        assert_eq!(
            event.audit_query(),
            Some(AuditQuery { guild_id: 9, target_id: 5, action: AuditAction::MemberUpdate })
        );
    }

    #[test]
    fn test_channel_lines() {
        let renamed = InboundEvent::ChannelUpdated {
            guild_id: 1,
            channel_id: 2,
            kind: ChannelKind::Text,
            old_name: "general".into(),
            new_name: "main".into(),
        };
        assert_eq!(
            renamed.activity_line(None).as_deref(),
            Some("Текстовый канал изменен: general -> main")
        );

        let deleted = InboundEvent::ChannelDeleted {
            guild_id: 1,
            channel_id: 3,
            kind: ChannelKind::Voice,
            name: "музыка".into(),
        };
        assert_eq!(
            deleted.activity_line(Some("mod")).as_deref(),
            Some("Голосовой канал музыка был удален (удалено пользователем mod)")
        );

        let unchanged = InboundEvent::ChannelUpdated {
            guild_id: 1,
            channel_id: 2,
            kind: ChannelKind::Text,
            old_name: "same".into(),
            new_name: "same".into(),
        };
        assert_eq!(unchanged.activity_line(None), None);
    }
}

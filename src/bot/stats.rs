//! Message counters persisted in the `stats` document.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bot::corpus::MediaKind;

pub const VERSION: &str = "1.0.0";

/// Kind of message for the per-type counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    Gif,
}

impl From<MediaKind> for MessageKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::StaticImage => MessageKind::Image,
            MediaKind::Gif => MessageKind::Gif,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Received,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct General {
    pub start_date: String,
    #[serde(default)]
    pub uptime: u64,
    #[serde(default)]
    pub restarts: u64,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    VERSION.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ByType {
    #[serde(default)]
    pub text: u64,
    #[serde(default)]
    pub image: u64,
    #[serde(default)]
    pub gif: u64,
}

impl ByType {
    pub fn total(&self) -> u64 {
        self.text + self.image + self.gif
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default)]
    pub total_received: u64,
    #[serde(default)]
    pub total_sent: u64,
    #[serde(default)]
    pub by_type: ByType,
    #[serde(default)]
    pub by_day: BTreeMap<String, u64>,
    #[serde(default)]
    pub peak_time: Option<String>,
    #[serde(default)]
    pub slowest_time: Option<String>,
}

/// The `stats` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub general: General,
    #[serde(default)]
    pub messages: Messages,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Statistics {
    pub fn new(started: DateTime<Local>) -> Self {
        Self {
            general: General {
                start_date: started.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                uptime: 0,
                restarts: 0,
                version: default_version(),
            },
            messages: Messages::default(),
        }
    }

    pub fn record_restart(&mut self) {
        self.general.restarts += 1;
    }

    /// Count one message on `day`. `uptime_secs` is this process's uptime.
    pub fn record(&mut self, kind: MessageKind, direction: Direction, day: NaiveDate, uptime_secs: u64) {
        let m = &mut self.messages;
        match direction {
            Direction::Received => m.total_received += 1,
            Direction::Sent => m.total_sent += 1,
        }
        match kind {
            MessageKind::Text => m.by_type.text += 1,
            MessageKind::Image => m.by_type.image += 1,
            MessageKind::Gif => m.by_type.gif += 1,
        }
        *m.by_day.entry(day.format("%Y-%m-%d").to_string()).or_insert(0) += 1;

        // BTreeMap iterates oldest first, so ties go to the earliest day.
        m.peak_time = m
            .by_day
            .iter()
            .fold(None::<(&String, u64)>, |best, (d, &n)| match best {
                Some((_, b)) if b >= n => best,
                _ => Some((d, n)),
            })
            .map(|(d, _)| d.clone());
        m.slowest_time = m
            .by_day
            .iter()
            .fold(None::<(&String, u64)>, |best, (d, &n)| match best {
                Some((_, b)) if b <= n => best,
                _ => Some((d, n)),
            })
            .map(|(d, _)| d.clone());

        self.general.uptime = uptime_secs;
    }
}

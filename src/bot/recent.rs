//! Recently seen messages, for naming the author and content of deletes
//! and edits. The gateway only reports ids for those.

use std::collections::{HashMap, VecDeque};

use crate::bot::message::Author;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    pub author: Author,
    pub content: String,
}

/// Bounded id lookup. The oldest entry goes first when full.
pub struct RecentMessages {
    capacity: usize,
    order: VecDeque<u64>,
    messages: HashMap<u64, RecentMessage>,
}

impl RecentMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            messages: HashMap::new(),
        }
    }

    pub fn add(&mut self, message_id: u64, author: Author, content: String) {
        if self
            .messages
            .insert(message_id, RecentMessage { author, content })
            .is_none()
        {
            self.order.push_back(message_id);
        }
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.messages.remove(&old);
            }
        }
    }

    /// Replace the content. Returns the message as it was before.
    pub fn edit(&mut self, message_id: u64, new_content: &str) -> Option<RecentMessage> {
        let msg = self.messages.get_mut(&message_id)?;
        let before = msg.clone();
        msg.content = new_content.to_string();
        Some(before)
    }

    pub fn remove(&mut self, message_id: u64) -> Option<RecentMessage> {
        let msg = self.messages.remove(&message_id)?;
        self.order.retain(|id| *id != message_id);
        Some(msg)
    }

    #[cfg(test)]
    pub fn get(&self, message_id: u64) -> Option<&RecentMessage> {
        self.messages.get(&message_id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for RecentMessages {
    fn default() -> Self {
        Self::new(1000)
    }
}

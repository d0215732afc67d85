//! In-memory message store: role-tagged messages kept in user/assistant pairs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// On-disk transcript format: `{ "messages": [ { "role", "content" }, ... ] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub messages: Vec<Message>,
}

/// Ordered sequence of messages. The length is always even and every pair
/// is a user message followed by an assistant message.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message and its assistant reply.
    ///
    /// Fails without touching the store when either side is blank.
    pub fn append_pair(&mut self, user: &str, assistant: &str) -> Result<()> {
        if user.trim().is_empty() {
            return Err(Error::Validation("user message is empty".into()));
        }
        if assistant.trim().is_empty() {
            return Err(Error::Validation("assistant reply is empty".into()));
        }
        self.messages.push(Message { role: Role::User, content: user.to_string() });
        self.messages.push(Message { role: Role::Assistant, content: assistant.to_string() });
        self.revision += 1;
        Ok(())
    }

    /// Remove the pair containing `index`. Returns `false` when out of range.
    pub fn remove_pair(&mut self, index: usize) -> bool {
        if index >= self.messages.len() {
            return false;
        }
        let start = index - index % 2;
        self.messages.drain(start..start + 2);
        self.revision += 1;
        true
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(Error::NothingToClear);
        }
        self.messages.clear();
        self.revision += 1;
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&Message, &Message)> {
        self.messages.chunks_exact(2).map(|p| (&p[0], &p[1]))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Bumped on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Build a store from a transcript, validating role order pair by pair.
    pub fn from_transcript(transcript: &Transcript) -> Result<Self> {
        let msgs = &transcript.messages;
        if msgs.len() % 2 != 0 {
            return Err(Error::Validation(format!(
                "transcript has {} messages; expected user/assistant pairs",
                msgs.len()
            )));
        }
        let mut store = Self::new();
        for (i, pair) in msgs.chunks_exact(2).enumerate() {
            if pair[0].role != Role::User || pair[1].role != Role::Assistant {
                return Err(Error::Validation(format!(
                    "pair {} must be a user message followed by an assistant message",
                    i
                )));
            }
            store.append_pair(&pair[0].content, &pair[1].content)?;
        }
        Ok(store)
    }

    pub fn to_transcript(&self) -> Transcript {
        Transcript { messages: self.messages.clone() }
    }
}

impl Transcript {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Validation(format!("invalid transcript JSON: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Validation(e.to_string()))
    }
}

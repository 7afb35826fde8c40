//! UI-agnostic chat state types
//!
//! These are the values the widget keeps and the payload it sends to the
//! assistant service. Nothing here depends on the terminal front end.

use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
}

/// A rendered chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: ChatRole,
    pub text: String,
    /// Planning tool reported by a final reply, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl DisplayMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            tool: None,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Agent,
            text: text.into(),
            tool: None,
        }
    }
}

/// One entry of the history sent to the backend for context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Body of `POST <backend>/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    pub conversation: Vec<ConversationTurn>,
}

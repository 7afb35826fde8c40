//! The chat widget: owned state plus the submit/resolve operations.
//!
//! The widget never talks to the network itself. `submit` records the
//! user's message and hands back the request to send; whoever sends it
//! calls `resolve` with the outcome. Every mutation raises a redraw flag
//! that the event loop consumes with [`ChatWidget::take_redraw`].

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ChatBackend, ChatError};
use crate::input::InputBuffer;
use crate::reply::{interpret, AgentReply};
use crate::state::{ChatPayload, ConversationTurn, DisplayMessage};

/// A submission that is waiting for the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Monotonic per widget, starting at 1
    pub seq: u64,
    pub payload: ChatPayload,
}

#[derive(Debug)]
pub struct ChatWidget {
    messages: Vec<DisplayMessage>,
    conversation: Vec<ConversationTurn>,
    pub input: InputBuffer,
    in_flight: BTreeSet<u64>,
    next_seq: u64,
    redraw: bool,
}

impl ChatWidget {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![DisplayMessage::agent(greeting)],
            conversation: Vec::new(),
            input: InputBuffer::new(),
            in_flight: BTreeSet::new(),
            next_seq: 1,
            redraw: true,
        }
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn conversation(&self) -> &[ConversationTurn] {
        &self.conversation
    }

    /// Number of submissions still waiting for a response
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_awaiting(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Mark the widget as needing a redraw after an input edit
    pub fn touch(&mut self) {
        self.redraw = true;
    }

    /// Returns whether anything changed since the last call, and resets it
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Record the current input as a user message and return the request
    /// to send. Returns `None` and changes nothing when the trimmed input
    /// is empty.
    pub fn submit(&mut self) -> Option<PendingRequest> {
        let text = self.input.trimmed();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();

        self.messages.push(DisplayMessage::user(text.clone()));
        self.conversation.push(ConversationTurn::user(text.clone()));
        self.input.clear();

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(seq);
        self.redraw = true;

        debug!(seq, turns = self.conversation.len(), "submitted message");

        Some(PendingRequest {
            seq,
            payload: ChatPayload {
                message: text,
                conversation: self.conversation.clone(),
            },
        })
    }

    /// Append the agent message for a finished request.
    ///
    /// Completions are appended in the order they arrive, whatever their
    /// `seq`. Failures become `Error: <description>` bubbles.
    pub fn resolve(&mut self, seq: u64, outcome: Result<Value, ChatError>) -> &DisplayMessage {
        if !self.in_flight.remove(&seq) {
            debug!(seq, "resolved a request that was not tracked");
        }

        let message = match outcome {
            Ok(body) => match interpret(&body) {
                AgentReply::Reply { text, tool } => DisplayMessage {
                    tool,
                    ..DisplayMessage::agent(text)
                },
                AgentReply::Raw(text) => {
                    info!(seq, "unrecognized reply shape, showing raw body");
                    DisplayMessage::agent(text)
                }
            },
            Err(err) => {
                info!(seq, error = %err, "chat request failed");
                DisplayMessage::agent(format!("Error: {err}"))
            }
        };

        self.messages.push(message);
        self.redraw = true;
        &self.messages[self.messages.len() - 1]
    }

    /// Submit and wait for the backend inline. Used by one-shot callers
    /// that do not run an event loop.
    pub async fn submit_with<B>(&mut self, backend: &B) -> Option<&DisplayMessage>
    where
        B: ChatBackend + ?Sized,
    {
        let request = self.submit()?;
        let outcome = backend.chat(&request.payload).await;
        Some(self.resolve(request.seq, outcome))
    }
}

pub mod app;
pub mod client;
pub mod config;
pub mod handler;
pub mod input;
pub mod logging;
pub mod reply;
pub mod state;
pub mod tui;
pub mod ui;
pub mod widget;

// Re-export main types for convenience
pub use client::{ChatBackend, ChatClient, ChatError};
pub use config::{Config, Settings};
pub use input::InputBuffer;
pub use reply::{interpret, AgentReply};
pub use state::{ChatPayload, ChatRole, ConversationTurn, DisplayMessage};
pub use widget::{ChatWidget, PendingRequest};

use std::sync::Arc;

use ratatui::layout::Rect;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::{ChatBackend, ChatError};
use crate::tui::AppEvent;
use crate::ui::transcript_height;
use crate::widget::ChatWidget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub widget: ChatWidget,
    pub backend_base: String,

    backend: Arc<dyn ChatBackend>,
    events: mpsc::UnboundedSender<AppEvent>,

    // Chat pane scrolling
    pub chat_scroll: u16,
    /// Keep the newest message in view as replies arrive
    pub follow_tail: bool,
    pub chat_height: u16, // inner height, set during render
    pub chat_width: u16,  // inner width, set during render
    pub chat_area: Option<Rect>,

    pub animation_frame: u8, // 0-2 for ellipsis animation
    dirty: bool,
}

impl App {
    pub fn new(
        widget: ChatWidget,
        backend: Arc<dyn ChatBackend>,
        events: mpsc::UnboundedSender<AppEvent>,
        backend_base: impl Into<String>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            widget,
            backend_base: backend_base.into(),
            backend,
            events,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
            dirty: true,
        }
    }

    /// Submit the current input and send it in the background. The reply
    /// comes back through the event loop as [`AppEvent::Reply`].
    pub fn submit(&mut self) {
        let Some(request) = self.widget.submit() else {
            return;
        };

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.chat(&request.payload).await;
            if events
                .send(AppEvent::Reply {
                    seq: request.seq,
                    outcome,
                })
                .is_err()
            {
                debug!(seq = request.seq, "event loop gone, dropping reply");
            }
        });

        self.follow_tail = true;
        self.scroll_to_bottom();
    }

    pub fn apply_reply(&mut self, seq: u64, outcome: Result<Value, ChatError>) {
        self.widget.resolve(seq, outcome);
        if self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
            self.dirty = true;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the screen must be redrawn; resets both flags
    pub fn take_redraw(&mut self) -> bool {
        let widget = self.widget.take_redraw();
        std::mem::take(&mut self.dirty) || widget
    }

    fn max_scroll(&self) -> u16 {
        let total = transcript_height(
            self.widget.messages(),
            self.wrap_width(),
            self.widget.is_awaiting(),
        );
        total.saturating_sub(self.visible_height())
    }

    fn wrap_width(&self) -> u16 {
        // Fall back to a sane width before the first render
        if self.chat_width > 0 {
            self.chat_width
        } else {
            50
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.dirty = true;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll == max;
        self.dirty = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
        self.dirty = true;
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.visible_height() / 2);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.visible_height() / 2);
    }

    /// Re-anchor after a resize changed the wrap width
    pub fn on_resize(&mut self) {
        if self.follow_tail {
            self.scroll_to_bottom();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
            self.dirty = true;
        }
    }
}

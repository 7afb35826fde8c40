use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};

use unicode_width::UnicodeWidthChar;

use crate::app::{App, InputMode};
use crate::state::{ChatRole, DisplayMessage};

const PLACEHOLDER: &str = "e.g. Plan 3 days in Manali 2026-02-10 to 2026-02-13 - Mid budget";

/// Turn `**bold**` runs into bold spans. An unmatched `**` stays literal.
fn styled_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    // An even number of parts means the last marker was never closed
    let closed = if parts.len() % 2 == 0 { parts.len() - 1 } else { parts.len() };

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i >= closed {
            spans.push(Span::raw(format!("**{part}")));
        } else if i % 2 == 0 {
            if !part.is_empty() {
                spans.push(Span::raw(part.to_string()));
            }
        } else if part.is_empty() {
            spans.push(Span::raw("****"));
        } else {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.widget.in_flight();
    let pending_indicator = if pending > 0 {
        format!(" [{} pending]", pending)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" Trip Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend_base.clone(), Style::default().fg(Color::Gray)),
        Span::styled(pending_indicator, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn role_line(msg: &DisplayMessage) -> Line<'static> {
    match msg.role {
        ChatRole::User => Line::from(Span::styled(
            "You",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .right_aligned(),
        ChatRole::Agent => {
            let mut spans = vec![Span::styled(
                "Agent",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )];
            if let Some(tool) = &msg.tool {
                spans.push(Span::styled(
                    format!(" · {}", tool),
                    Style::default().fg(Color::Magenta),
                ));
            }
            Line::from(spans)
        }
    }
}

/// The transcript as rendered: a role line, the message text and a blank
/// separator per message, then the "Thinking" indicator while requests are
/// in flight
pub fn transcript_lines(
    messages: &[DisplayMessage],
    awaiting: bool,
    animation_frame: u8,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in messages {
        lines.push(role_line(msg));
        match msg.role {
            ChatRole::User => {
                for line in msg.text.lines() {
                    lines.push(
                        Line::styled(line.to_string(), Style::default().fg(Color::Cyan))
                            .right_aligned(),
                    );
                }
            }
            ChatRole::Agent => {
                for line in msg.text.lines() {
                    lines.push(styled_line(line));
                }
            }
        }
        if msg.text.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::default());
    }

    if awaiting {
        lines.push(Line::from(Span::styled(
            "Agent",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn transcript_paragraph(lines: Vec<Line<'static>>) -> Paragraph<'static> {
    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

/// Rows the transcript occupies once word-wrapped at `width` columns
pub fn transcript_height(messages: &[DisplayMessage], width: u16, awaiting: bool) -> u16 {
    let rows = transcript_paragraph(transcript_lines(messages, awaiting, 0)).line_count(width.max(1));
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area and inner size for scroll calculations and mouse hit-testing
    app.chat_area = Some(area);
    let resized = app.chat_width != area.width.saturating_sub(2)
        || app.chat_height != area.height.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if resized {
        app.on_resize();
    }

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let lines = transcript_lines(
        app.widget.messages(),
        app.widget.is_awaiting(),
        app.animation_frame,
    );
    let chat = transcript_paragraph(lines)
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    let total = transcript_height(app.widget.messages(), app.chat_width, app.widget.is_awaiting());
    if total > app.chat_height {
        let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(app.chat_height) as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            Rect {
                y: area.y + 1,
                height: area.height.saturating_sub(2),
                ..area
            },
            &mut scrollbar_state,
        );
    }
}

/// Slice of the input that fits in `width` columns, and the cursor column
/// within it. Scrolls right just far enough to keep the cursor visible.
fn input_window(text: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    let col = |c: &char| c.width().unwrap_or(0);

    let mut start = 0;
    let mut before: usize = chars[..cursor].iter().map(col).sum();
    // Leave one column for the cursor itself
    while start < cursor && before >= width {
        before -= col(&chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible: String = chars[start..]
        .iter()
        .take_while(|c| {
            used += col(*c);
            used <= width
        })
        .collect();
    (visible, u16::try_from(before).unwrap_or(u16::MAX))
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send) ");

    let input = &app.widget.input;

    // Horizontal scrolling keeps the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_window(input.as_str(), input.cursor(), inner_width);

    let paragraph = if input.is_empty() {
        Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(paragraph.block(block), area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style, hints) = match app.input_mode {
        InputMode::Editing => (
            " EDIT ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
            " Enter send  Esc scroll mode  PgUp/PgDn scroll  Ctrl-C quit",
        ),
        InputMode::Normal => (
            " SCROLL ",
            Style::default().bg(Color::Blue).fg(Color::White),
            " i edit  j/k scroll  g/G top/bottom  q quit",
        ),
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatBackend, ChatError};
    use crate::input::InputBuffer;
    use crate::state::ChatPayload;
    use crate::widget::ChatWidget;
    use async_trait::async_trait;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Idle;

    #[async_trait]
    impl ChatBackend for Idle {
        async fn chat(&self, _payload: &ChatPayload) -> Result<Value, ChatError> {
            Ok(Value::Null)
        }
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_styled_line_bold() {
        let line = styled_line("Stay at **Snow Valley Resorts** tonight");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Snow Valley Resorts");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_styled_line_unclosed_marker() {
        let line = styled_line("Budget: **mid");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "Budget: **mid");
        assert!(line.spans.iter().all(|s| !s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn test_renders_transcript() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            ChatWidget::new("Where to?"),
            Arc::new(Idle),
            tx,
            "http://localhost:8000",
        );
        app.widget.input = InputBuffer::from("Manali");
        app.widget.submit();
        app.widget.resolve(
            1,
            Ok(json!({"type": "final", "reply": "Day 1: Hadimba Temple", "tool": "generate_itinerary"})),
        );
        app.widget.resolve(2, Err(ChatError::Transport("timeout".to_string())));

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let screen = screen_text(&terminal);

        assert!(screen.contains("Where to?"));
        assert!(screen.contains("Manali"));
        assert!(screen.contains("Day 1: Hadimba Temple"));
        assert!(screen.contains("generate_itinerary"));
        assert!(screen.contains("Error: timeout"));
        assert!(screen.contains("http://localhost:8000"));
        assert_eq!(app.chat_width, 78);
    }

    #[test]
    fn test_renders_thinking_indicator() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(ChatWidget::new("Hi"), Arc::new(Idle), tx, "http://localhost:8000");
        app.widget.input = InputBuffer::from("Weather in Shimla?");
        app.widget.submit();

        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let screen = screen_text(&terminal);

        assert!(screen.contains("Thinking"));
        assert!(screen.contains("[1 pending]"));
    }

    #[test]
    fn test_long_words_stay_reachable() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(ChatWidget::new("Hi"), Arc::new(Idle), tx, "http://localhost:8000");
        app.apply_reply(
            1,
            Ok(json!({"reply": "Hadimbatempleearlymorning Solangvalleyparagliding Rohtangpasssnowpoint Oldmanalicafesevening Vashishthotsprings Jogninifallstrekking ENDMARKER"})),
        );

        let mut terminal = Terminal::new(TestBackend::new(40, 14)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen_text(&terminal).contains("ENDMARKER"));

        app.scroll_up(u16::MAX);
        app.scroll_down(100);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen_text(&terminal).contains("ENDMARKER"));
        assert!(app.follow_tail);
    }

    #[test]
    fn test_input_window_fits() {
        assert_eq!(input_window("Goa", 3, 20), ("Goa".to_string(), 3));
        assert_eq!(input_window("東京 trip", 2, 20), ("東京 trip".to_string(), 4));
    }

    #[test]
    fn test_input_window_scrolls_by_display_width() {
        // Five double-width chars need ten columns; only eight fit
        let (visible, cursor_x) = input_window("東京へ行く", 5, 8);
        assert_eq!(visible, "へ行く");
        assert_eq!(cursor_x, 6);

        let (visible, cursor_x) = input_window("abcdefghij", 10, 5);
        assert_eq!(visible, "ghij");
        assert_eq!(cursor_x, 4);
    }
}

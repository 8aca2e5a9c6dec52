use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use streambot_shared::MessageRole;

use crate::controller::Message;
use crate::time::{elapsed_ms, format_duration_ms, format_hm, format_hms};

pub const TYPING_INDICATOR: &str = "●●●";

const USER_BACKGROUND: Color = Color::Rgb(0x10, 0x30, 0x5a);
const OTHER_BACKGROUND: Color = Color::Rgb(0x0b, 0x15, 0x2b);

#[derive(Debug, Clone, PartialEq)]
pub enum BlockBody {
    Text(String),
    Typing,
}

/// One rendered message bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayBlock {
    pub role: MessageRole,
    pub alignment: Alignment,
    pub background: Color,
    pub body: BlockBody,
    pub caption: String,
}

pub fn render_messages(messages: &[Message]) -> Vec<DisplayBlock> {
    messages.iter().map(render_message).collect()
}

fn render_message(message: &Message) -> DisplayBlock {
    let (alignment, background) = match message.role {
        MessageRole::User => (Alignment::Right, USER_BACKGROUND),
        MessageRole::Assistant | MessageRole::System => (Alignment::Left, OTHER_BACKGROUND),
    };

    let waiting = message.role == MessageRole::Assistant
        && message.content.is_empty()
        && message.started_at.is_none();
    let body = if waiting {
        BlockBody::Typing
    } else {
        BlockBody::Text(message.content.clone())
    };

    DisplayBlock {
        role: message.role,
        alignment,
        background,
        body,
        caption: caption(message),
    }
}

fn caption(message: &Message) -> String {
    if message.role != MessageRole::Assistant {
        return format_hm(message.created_at);
    }
    let started = message.started_at.or(message.created_at);
    match message.ended_at {
        Some(ended) => format!(
            "Started {} • Ended {} • Duration {}",
            format_hms(started),
            format_hms(Some(ended)),
            format_duration_ms(elapsed_ms(started, Some(ended)))
        ),
        None => format!("Started {} • …", format_hms(started)),
    }
}

/// Every block's lines, top to bottom, ready for one wrapped `Paragraph`.
pub fn chat_lines(blocks: &[DisplayBlock]) -> Vec<Line<'_>> {
    blocks.iter().flat_map(DisplayBlock::to_lines).collect()
}

impl DisplayBlock {
    pub fn to_lines(&self) -> Vec<Line<'_>> {
        let bubble = Style::default().bg(self.background).fg(Color::White);
        let (label, label_color) = match self.role {
            MessageRole::User => ("You", Color::Cyan),
            MessageRole::Assistant => ("Assistant", Color::Green),
            MessageRole::System => ("System", Color::Yellow),
        };
        let mut lines = vec![Line::from(Span::styled(
            label,
            Style::default().fg(label_color).add_modifier(Modifier::BOLD),
        ))];
        lines.extend(match &self.body {
            BlockBody::Typing => vec![Line::from(Span::styled(
                TYPING_INDICATOR,
                bubble.add_modifier(Modifier::SLOW_BLINK),
            ))],
            // Keep blank lines; `str::lines` would drop a trailing one.
            BlockBody::Text(content) => content
                .split('\n')
                .map(|line| Line::from(Span::styled(line, bubble)))
                .collect(),
        });
        for line in &mut lines {
            line.alignment = Some(self.alignment);
        }

        lines.push(
            Line::from(Span::styled(
                self.caption.as_str(),
                Style::default().fg(Color::DarkGray),
            ))
            .alignment(self.alignment),
        );
        lines.push(Line::from(""));
        lines
    }
}

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use mutiger_weg_core::{ChatRole, ConversationSnapshot, FormField};

use crate::app::{App, Focus, InputTarget};

const TITLE: &str = "🎯 Mein Mutiger Weg Berufsinspirationen";
const WELCOME: &str = "Willkommen! 💙 Hier bekommst du neue Perspektiven für deine Berufswahl.";
const PRIVACY_WARNING: &str =
    "⚠️ Bitte gib hier keine personenbezogenen Daten ein (z. B. deinen Namen, deine Adresse oder deine Schule)";
const SUBMIT_LABEL: &str = "🎯 Berufsinspirationen erhalten";
const CHAT_TITLE: &str = "💬 Dein Feedback";
const FOLLOW_UP_LABEL: &str = "Was denkst du zu deinen Berufsinspirationen?";
const SEND_LABEL: &str = "Senden";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' || chars.peek() != Some(&'*') {
            current_text.push(c);
            continue;
        }
        chars.next();

        let mut bold_text = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            bold_text.push(c);
        }

        if found_close && !bold_text.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
        } else {
            // No closing **, keep it literal
            current_text.push_str("**");
            current_text.push_str(&bold_text);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

/// Lines for the visible conversation, including the loading indicator.
/// System messages never reach the screen.
pub fn transcript_lines(snapshot: &ConversationSnapshot, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in snapshot.transcript() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "Du:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Coach:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
            ChatRole::System => continue,
        }
        lines.push(Line::default());
    }

    if snapshot.loading {
        let dots = ".".repeat(animation_frame as usize + 1);
        let label = if snapshot.started {
            format!("Denke nach{}", dots)
        } else {
            format!("Generiere deine Berufsinspirationen{}", dots)
        };
        lines.push(Line::from(Span::styled(
            "Coach:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // The chat section appears with the first request
    if app.snapshot.started || app.snapshot.loading {
        let [form_area, chat_area] = Layout::vertical([
            Constraint::Length(form_height()),
            Constraint::Min(6),
        ])
        .areas(body_area);
        render_form(app, frame, form_area);
        render_chat(app, frame, chat_area);
    } else {
        app.transcript_area = None;
        render_form(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if let Some(notice) = app.notice.clone() {
        render_notice(&notice, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{}: {} ", app.provider.display_name(), app.controller.model()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Intro (2 lines + blank), three field boxes, submit button
fn form_height() -> u16 {
    3 + 3 * 3 + 3
}

fn render_form(app: &mut App, frame: &mut Frame, area: Rect) {
    let [intro_area, fields_area, submit_area, _rest] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(9),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let intro = Paragraph::new(Text::from(vec![
        Line::from(WELCOME),
        Line::from(Span::styled(PRIVACY_WARNING, Style::default().fg(Color::Yellow))),
    ]))
    .wrap(Wrap { trim: true });
    frame.render_widget(intro, intro_area);

    let field_areas = Layout::vertical([Constraint::Length(3); 3]).split(fields_area);
    for (field, field_area) in FormField::all().into_iter().zip(field_areas.iter()) {
        render_text_input(app, frame, *field_area, InputTarget::Form(field), field.label());
    }

    render_submit_button(app, frame, submit_area);
}

/// Single-line bordered input with horizontal scrolling that keeps the cursor visible
fn render_text_input(app: &App, frame: &mut Frame, area: Rect, target: InputTarget, title: &str) {
    let focused = app.focus.input_target() == Some(target);
    let editable = app.can_edit(target);
    let border_color = if focused && editable { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", title));

    let text = app.input_text(target);
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor(target);

    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let visible_text: String = text.chars().skip(scroll_offset).take(inner_width).collect();
    let style = if editable {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(visible_text).style(style).block(block);
    frame.render_widget(input, area);

    if focused && editable {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_submit_button(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Submit;
    let enabled = !app.is_busy();

    let style = match (enabled, focused) {
        (false, _) => Style::default().fg(Color::DarkGray),
        (true, true) => Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
    };
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let button_width = (SUBMIT_LABEL.chars().count() as u16 + 6).min(area.width);
    let button_area = Rect::new(area.x, area.y, button_width, area.height);

    let button = Paragraph::new(Span::styled(SUBMIT_LABEL, style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(border_color)));
    frame.render_widget(button, button_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
    ])
    .areas(area);

    let transcript_focused = app.focus == Focus::Transcript;
    let border_color = if transcript_focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", CHAT_TITLE));

    // Store area and inner size for mouse hit-testing and scroll math
    app.transcript_area = Some(transcript_area);
    app.transcript_height = transcript_area.height.saturating_sub(2);
    app.transcript_width = transcript_area.width.saturating_sub(2);
    if app.pin_transcript {
        app.scroll_transcript_to_bottom();
    }

    let lines = transcript_lines(&app.snapshot, app.animation_frame);
    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.transcript_scroll, 0));
    frame.render_widget(chat, transcript_area);

    if app.snapshot.started {
        let send_width = (SEND_LABEL.chars().count() as u16 + 4).min(input_area.width);
        let [field_area, send_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(send_width),
        ])
        .areas(input_area);

        render_text_input(app, frame, field_area, InputTarget::FollowUp, FOLLOW_UP_LABEL);

        let send_style = if app.snapshot.can_send() && app.task.is_none() {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let send = Paragraph::new(Span::styled(SEND_LABEL, send_style))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
        frame.render_widget(send, send_area);
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.notice.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" ok ", label_style),
        ]
    } else {
        let mut hints = vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" weiter ", label_style),
        ];
        match app.focus {
            Focus::Field(_) | Focus::Submit => hints.extend(vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" absenden ", label_style),
            ]),
            Focus::Transcript => hints.extend(vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scrollen ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" antworten ", label_style),
            ]),
            Focus::FollowUp => hints.extend(vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" senden ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" verlauf ", label_style),
            ]),
        }
        hints.extend(vec![
            Span::styled(" Ctrl-C ", key_style),
            Span::styled(" beenden ", label_style),
        ]);
        hints
    };

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_notice(notice: &str, frame: &mut Frame, area: Rect) {
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Hinweis ");

    let text = Paragraph::new(notice.to_string())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(text, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{fill_form, settle, test_app};
    use mutiger_weg_core::prompt::SYSTEM_PROMPT;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_parse_markdown_line_bold() {
        let line = parse_markdown_line("1. **Mediengestalter** - kreativ");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Mediengestalter");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_line_unclosed_is_literal() {
        let line = parse_markdown_line("**offen");
        assert_eq!(line_text(&line), "**offen");
    }

    #[test]
    fn test_transcript_lines_hide_system_prompt() {
        let snapshot = ConversationSnapshot {
            messages: vec![
                mutiger_weg_core::ChatMessage::system(SYSTEM_PROMPT),
                mutiger_weg_core::ChatMessage::user("Meine Antworten"),
                mutiger_weg_core::ChatMessage::assistant("Hier sind Ideen"),
            ],
            started: true,
            ..Default::default()
        };
        let text: Vec<String> = transcript_lines(&snapshot, 0).iter().map(line_text).collect();
        assert_eq!(text, vec!["Du:", "Meine Antworten", "", "Coach:", "Hier sind Ideen", ""]);
    }

    #[test]
    fn test_loading_indicator_depends_on_phase() {
        let mut snapshot = ConversationSnapshot { loading: true, ..Default::default() };
        let text: Vec<String> = transcript_lines(&snapshot, 2).iter().map(line_text).collect();
        assert_eq!(text.last().map(String::as_str), Some("Generiere deine Berufsinspirationen..."));

        snapshot.started = true;
        let text: Vec<String> = transcript_lines(&snapshot, 0).iter().map(line_text).collect();
        assert_eq!(text.last().map(String::as_str), Some("Denke nach."));
    }

    #[test]
    fn test_initial_screen_shows_form_only() {
        let mut app = test_app("unused", false);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("Berufsinspirationen erhalten"));
        assert!(screen.contains("Top 3 Interessen"));
        assert!(!screen.contains("Dein Feedback"));
        assert!(app.transcript_area.is_none());
    }

    #[tokio::test]
    async fn test_chat_renders_reply_without_system_prompt() {
        let mut app = test_app("Idee: Umweltingenieurin", false);
        fill_form(&mut app);
        app.submit();
        settle(&mut app).await;

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("Dein Feedback"));
        assert!(screen.contains("Idee: Umweltingenieurin"));
        assert!(screen.contains("Senden"));
        assert!(!screen.contains("inspirierender KI-Coach"));
        assert!(app.transcript_area.is_some());
    }

    #[test]
    fn test_notice_popup_is_rendered() {
        let mut app = test_app("unused", false);
        app.notice = Some("Bitte fülle alle Felder aus.".to_string());
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("Hinweis"));
        assert!(screen.contains("Bitte fülle alle Felder aus."));
    }
}

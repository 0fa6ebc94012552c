use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use girasol_widget::markdown::{self, Emphasis};
use girasol_widget::view::{Author, Bubble};
use girasol_widget::ChatBackend;
use crate::app::App;

/// Terminal rendering of a markdown-lite line, styled with the same rules
/// the HTML renderer uses.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let spans: Vec<Span<'static>> = markdown::line_runs(text)
        .into_iter()
        .map(|(emphasis, run)| match emphasis {
            Emphasis::Plain => Span::raw(run),
            Emphasis::Bold => Span::styled(run, Style::default().add_modifier(Modifier::BOLD)),
            Emphasis::Italic => Span::styled(run, Style::default().add_modifier(Modifier::ITALIC)),
        })
        .collect();

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn bubble_lines(bubble: &Bubble, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    match bubble.author {
        Author::User => {
            lines.push(Line::from(Span::styled(
                "Tú:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            // User text is shown literally, never parsed
            for line in bubble.text.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Author::Bot => {
            lines.push(Line::from(Span::styled(
                "Girasol:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            if bubble.placeholder {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Pensando{} 🌻", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                for line in bubble.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
    }

    lines.push(Line::default());
    lines
}

pub fn render<B: ChatBackend>(app: &mut App<B>, frame: &mut Frame) {
    let area = frame.area();

    let [body_area, footer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    if app.widget.view().open {
        render_panel(app, frame, body_area);
    } else {
        render_launcher(frame, body_area);
    }

    render_footer(app, frame, footer_area);
}

/// Closed state: only the toggler, bottom right.
fn render_launcher(frame: &mut Frame, area: Rect) {
    let [_, bottom] = Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);
    let [_, button_area] = Layout::horizontal([Constraint::Min(0), Constraint::Length(8)]).areas(bottom);

    let button = Paragraph::new("💬")
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(button, button_area);
}

fn render_panel<B: ChatBackend>(app: &mut App<B>, frame: &mut Frame, area: Rect) {
    let [header_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);
    app.clamp_scroll();

    let view = app.widget.view();

    let status_color = if app.widget.is_ready() { Color::Green } else { Color::DarkGray };
    let header = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            format!(" {} ", view.title),
            Style::default().fg(Color::Yellow).bold(),
        )),
        Line::from(Span::styled(
            format!(" {}", view.status),
            Style::default().fg(status_color),
        )),
    ]))
    .style(Style::default().bg(Color::Black));
    frame.render_widget(header, header_area);

    let lines: Vec<Line> = view
        .bubbles
        .iter()
        .flat_map(|bubble| bubble_lines(bubble, app.animation_frame))
        .collect();

    let chat = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let input = &view.input;
    let input_border_color = if input.enabled { Color::Yellow } else { Color::DarkGray };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Mensaje ")
        .title(
            ratatui::widgets::block::Title::from(format!(" {} ", input.counter()))
                .alignment(Alignment::Right),
        );

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input_widget = if input.value().is_empty() {
        Paragraph::new(Span::styled(
            girasol_widget::view::INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        // Get the visible slice of the input
        let visible_text: String = input
            .value()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input_widget.block(input_block), input_area);

    if input.enabled {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_footer<B: ChatBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let hints = if app.widget.view().open {
        " Enter enviar · ↑↓ desplazar · Esc cerrar · Ctrl-C salir "
    } else {
        " Enter abrir chat · q salir "
    };

    let footer = Line::from(vec![
        Span::styled(" GIRASOL ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(line: &Line) -> Vec<(String, bool, bool)> {
        line.spans
            .iter()
            .map(|s| {
                (
                    s.content.to_string(),
                    s.style.add_modifier.contains(Modifier::BOLD),
                    s.style.add_modifier.contains(Modifier::ITALIC),
                )
            })
            .collect()
    }

    #[test]
    fn test_bold_and_italic_spans() {
        let line = parse_markdown_line("**Hola** y *adiós*");
        assert_eq!(
            styled(&line),
            vec![
                ("Hola".to_string(), true, false),
                (" y ".to_string(), false, false),
                ("adiós".to_string(), false, true),
            ]
        );
    }

    #[test]
    fn test_bullet_gets_glyph() {
        let line = parse_markdown_line("  - Dune");
        assert_eq!(styled(&line), vec![("• Dune".to_string(), false, false)]);

        let line = parse_markdown_line("\t* Alien");
        assert_eq!(styled(&line), vec![("• Alien".to_string(), false, false)]);
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let line = parse_markdown_line("5 * 3");
        assert_eq!(styled(&line), vec![("5 * 3".to_string(), false, false)]);
    }

    #[test]
    fn test_unclosed_bold_matches_html() {
        // `to_html` gives "<i></i>abierto": no stars left, plain word shown
        let line = parse_markdown_line("**abierto");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "abierto");
    }
}

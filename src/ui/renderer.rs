use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::commands::matching_commands;
use crate::core::app::persona_form::FORM_FIELDS;
use crate::core::app::{App, PersonaForm, UiMode};
use crate::core::session::ModelListing;
use crate::core::text_wrapping::wrap_text;

const SIDEBAR_WIDTH: u16 = 32;
const MAX_INPUT_LINES: u16 = 6;

pub fn ui(f: &mut Frame, app: &mut App) {
    let area = f.area();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);

    render_sidebar(f, app, columns[0]);

    let input_height = app.ui.input_line_count().clamp(1, MAX_INPUT_LINES) + 2;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(columns[1]);

    render_title(f, app, rows[0]);
    render_transcript(f, app, rows[1]);
    render_status(f, app, rows[2]);
    render_input(f, app, rows[3]);

    if let UiMode::AddPersona(form) = &app.ui.mode {
        render_persona_form(f, form, area);
    }
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);
    let selected_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled("Ollama Host", heading)),
        Line::from(app.session.host().to_string()),
        Line::from(""),
        Line::from(Span::styled("Bots", heading)),
    ];

    let selected_persona = app.session.selected_persona_name();
    for persona in app.session.roster().iter() {
        let is_selected = persona.name == selected_persona;
        let marker = if is_selected { "▶ " } else { "  " };
        let style = if is_selected {
            selected_style
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{} {}", persona.display_avatar(), persona.name),
            style,
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Models", heading)));
    match app.session.models() {
        ModelListing::Pending => lines.push(Line::from(Span::styled("Loading…", dim))),
        ModelListing::Failed(_) => lines.push(Line::from(Span::styled(
            "Unavailable",
            Style::default().fg(Color::Red),
        ))),
        ModelListing::Loaded(models) if models.is_empty() => {
            lines.push(Line::from(Span::styled("No models installed", dim)))
        }
        ModelListing::Loaded(models) => {
            let selected_model = app.session.selected_model();
            for model in models {
                let is_selected = selected_model == Some(model.as_str());
                let marker = if is_selected { "▶ " } else { "  " };
                let style = if is_selected {
                    selected_style
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(format!("{marker}{model}"), style)));
            }
        }
    }

    let sidebar = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .title(Span::styled(" Configuration ", heading)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(sidebar, area);
}

fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let persona = app.session.current_persona();
    let mut spans = vec![Span::styled(
        format!(" {} {}", persona.display_avatar(), persona.name),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(model) = app.session.selected_model() {
        spans.push(Span::styled(
            format!("  ·  {model}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Every line the chat pane would show, already wrapped to `width`.
pub fn build_transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let persona = app.session.current_persona();
    let user_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let assistant_style = Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD);
    let assistant_label = format!("{} {}", persona.display_avatar(), persona.name);

    let mut lines = Vec::new();
    let mut push_block = |label: &str, label_style: Style, content: &str, body: Style| {
        lines.push(Line::from(Span::styled(label.to_string(), label_style)));
        for wrapped in wrap_text(content, width) {
            lines.push(Line::from(Span::styled(wrapped, body)));
        }
        lines.push(Line::from(""));
    };

    for message in persona.transcript() {
        if !message.role.is_displayed() {
            continue;
        }
        if message.is_user() {
            push_block("You", user_style, &message.content, Style::default());
        } else {
            push_block(
                &assistant_label,
                assistant_style,
                &message.content,
                Style::default(),
            );
        }
    }

    if let Some(pending) = app.visible_pending_reply() {
        let content = format!("{}▌", pending.content);
        push_block(&assistant_label, assistant_style, &content, Style::default());
    }

    if let Some(error) = &app.ui.error {
        push_block(
            "Error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            error,
            Style::default().fg(Color::Red),
        );
    }

    if let ModelListing::Failed(error) = app.session.models() {
        if app.ui.error.as_deref() != Some(error.as_str()) {
            push_block(
                "Error",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                error,
                Style::default().fg(Color::Red),
            );
        }
    }

    if let Some(notice) = &app.ui.notice {
        push_block(
            "Info (Esc to dismiss)",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
            notice,
            Style::default().fg(Color::Gray),
        );
    }

    lines
}

fn render_transcript(f: &mut Frame, app: &mut App, area: Rect) {
    let inner_width = area.width.saturating_sub(2);
    let lines = build_transcript_lines(app, inner_width);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let max_offset = total.saturating_sub(area.height);

    // Offset counts up from the bottom; clamp it so PageDown works right away.
    app.ui.scroll_offset = app.ui.scroll_offset.min(max_offset);
    let top = max_offset - app.ui.scroll_offset;

    let transcript = Paragraph::new(lines).scroll((top, 0));
    let padded = Rect {
        x: area.x.saturating_add(1),
        width: inner_width,
        ..area
    };
    f.render_widget(transcript, padded);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let input = app.ui.get_input_text();
    let text = if input.starts_with('/') && !input.contains(' ') {
        let names: Vec<String> = matching_commands(&input[1..])
            .iter()
            .map(|command| format!("/{}", command.name))
            .collect();
        names.join("  ")
    } else if let Some(status) = &app.ui.status {
        status.clone()
    } else {
        "/help for commands".to_string()
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            format!(" {text}"),
            Style::default().fg(Color::DarkGray),
        )),
        area,
    );
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.is_streaming() {
        " Waiting for the reply… "
    } else {
        " What would you like to ask? "
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(app.ui.textarea(), inner);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_persona_form(f: &mut Frame, form: &PersonaForm, area: Rect) {
    let popup = centered_rect(70, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Create a New Bot ");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .split(inner);

    for (field, row) in FORM_FIELDS.into_iter().zip(rows.iter()) {
        f.render_widget(form.textarea(field), *row);
    }

    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(Span::styled(
                error.as_str(),
                Style::default().fg(Color::Red),
            ))
            .wrap(Wrap { trim: false }),
            rows[3],
        );
    }

    f.render_widget(
        Paragraph::new(Span::styled(
            "Tab next field • Enter save • Alt+Enter newline • Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
        rows[4],
    );
}

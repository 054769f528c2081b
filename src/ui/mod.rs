// UI module for rendering the TUI.
// Draws the file with its heat gutter, the hover panel, and the status bar.

mod gutter;

use ratatui::{prelude::*, widgets::*};

use crate::app::App;
use crate::controller::Mode;
use crate::state::LoadingState;

/// Main draw function that renders the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(1),    // File content
            Constraint::Length(4), // Hover panel
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title(frame, app, chunks[0]);
    draw_file(frame, app, chunks[1]);
    draw_hover(frame, app, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);

    // Help overlay (rendered last, on top of everything)
    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the file identity and current mode.
fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let (mode, mode_color) = match app.mode() {
        Mode::Showing => ("blame on", Color::Green),
        Mode::Hidden => ("blame off", Color::DarkGray),
    };

    let title = Line::from(vec![
        Span::styled(
            " remote-blame ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(app.viewer.file.to_string()),
        Span::raw("  "),
        Span::styled(format!("[{}]", mode), Style::default().fg(mode_color)),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(title).block(block), area);
}

/// Draw the file content with line numbers and the heat gutter.
fn draw_file(frame: &mut Frame, app: &mut App, area: Rect) {
    app.viewport_height = area.height as usize;

    let message = match &app.viewer.content {
        LoadingState::Idle => Some(("No file loaded".to_string(), Color::DarkGray)),
        LoadingState::Loading => Some(("⏳ Loading file...".to_string(), Color::Yellow)),
        LoadingState::Error(e) => Some((format!("❌ {}", e), Color::Red)),
        LoadingState::Loaded(_) => None,
    };
    if let Some((text, color)) = message {
        let text = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(color));
        frame.render_widget(text, area);
        return;
    }

    app.viewer.ensure_visible(app.viewport_height);
    let viewer = &app.viewer;
    let renderer = app.controller.renderer();
    let lines: Vec<Line> = viewer
        .content
        .data()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .skip(viewer.scroll)
        .take(app.viewport_height)
        .map(|(i, text)| {
            let line_style = if i == viewer.cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(vec![
                gutter::heat_span(renderer, viewer.bucket_at(i)),
                Span::styled(
                    format!("{:>6} │ ", i + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(text.as_str(), line_style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

/// Draw the hover panel for the cursor line.
fn draw_hover(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Line {} ", app.viewer.cursor + 1));

    let text = match (&app.viewer.hover, app.mode()) {
        (Some(hover), _) => Paragraph::new(hover.as_str()).wrap(Wrap { trim: true }),
        (None, Mode::Showing) => Paragraph::new(gutter::legend(app.controller.renderer())),
        (None, Mode::Hidden) => Paragraph::new("Press b to show blame")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(text.block(block), area);
}

/// Draw the status bar with keybinding hints and rate limit.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut hints = vec![
        Span::raw(" ↑↓ "),
        Span::styled("Move", Style::default().fg(Color::DarkGray)),
        Span::raw("  b "),
        Span::styled("Show blame", Style::default().fg(Color::DarkGray)),
        Span::raw("  B "),
        Span::styled("Hide", Style::default().fg(Color::DarkGray)),
        Span::raw("  ? "),
        Span::styled("Help", Style::default().fg(Color::DarkGray)),
        Span::raw("  q "),
        Span::styled("Quit", Style::default().fg(Color::DarkGray)),
    ];

    if let Some(status) = &app.status {
        hints.push(Span::styled(
            format!("  {}", status),
            Style::default().fg(Color::Yellow),
        ));
    }

    // Add rate limit info on the right if known
    let rate = app.rate_limit();
    if let Some(remaining) = rate.remaining.filter(|_| rate.limit > 0) {
        let rate_color = if remaining < 100 {
            Color::Red
        } else if remaining < 500 {
            Color::Yellow
        } else {
            Color::DarkGray
        };
        hints.push(Span::styled(
            format!("  API: {}/{}", remaining, rate.limit),
            Style::default().fg(rate_color),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

/// Draw the help overlay.
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 50;
    let popup_height = 14;
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(
        popup_x,
        popup_y,
        popup_width.min(area.width),
        popup_height.min(area.height),
    );

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(k, Style::default().fg(Color::Cyan)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        key("  ↑/↓ or j/k    ", "Move cursor"),
        key("  PgUp/Dn ^u/^d ", "Page"),
        key("  Home/End g/G  ", "Jump to start/end"),
        key("  b             ", "Show blame"),
        key("  B or Esc      ", "Hide blame"),
        key("  ?             ", "Show/hide this help"),
        key("  q             ", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::styled(" or ", Style::default().fg(Color::DarkGray)),
            Span::styled("?", Style::default().fg(Color::Yellow)),
            Span::styled(" to close", Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let help_paragraph = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help ")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
    );

    frame.render_widget(help_paragraph, popup_area);
}

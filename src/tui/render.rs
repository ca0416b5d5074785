//! UI rendering functions for the TUI.

use chrono::{Local, Utc};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::state::App;
use super::types::Focus;
use crate::card::EpisodeCard;
use crate::config::Keybindings;
use crate::controller::{ListView, NotificationKind};
use crate::format::{strip_control, truncate_chars};
use std::fmt::Write;

/// Draw the UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content (sidebar + main)
            Constraint::Length(3), // Footer
        ])
        .split(size);

    draw_header(frame, app, chunks[0]);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(30), // Filter sidebar
            Constraint::Min(0),     // Episodes
        ])
        .split(chunks[1]);

    draw_filters(frame, app, content_chunks[0]);

    let main_area = content_chunks[1];
    if matches!(app.controller.view(), ListView::Episodes(_)) {
        let cards = app.controller.cards(&Utc::now(), &Local);
        draw_episodes(frame, app, &cards, main_area);
    } else if matches!(app.controller.view(), ListView::Empty) {
        draw_empty_state(frame, app, main_area);
    } else if app.controller.is_loading() {
        draw_loading(frame, main_area);
    } else {
        draw_idle(frame, &app.keybindings, main_area);
    }

    draw_footer(frame, app, chunks[2]);

    if let Some(notification) = app.controller.active_notification() {
        draw_notification(frame, &notification.message, notification.kind);
    }

    if app.show_help {
        draw_help_modal(frame, &app.keybindings);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let count = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let refresh = app.controller.refresh_control();
    let refresh_style = if refresh.enabled {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "podcast-tracker",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.server_url),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} podcasts",
                count(app.controller.total_podcasts().map(|n| n.to_string()))
            ),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} pending episodes",
                count(app.controller.total_episodes().map(|n| n.to_string()))
            ),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(format!("[{}]", refresh.label()), refresh_style),
    ]))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn draw_filters(frame: &mut Frame, app: &mut App, area: Rect) {
    let border_style = if app.focus == Focus::Filters {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let active = app.controller.selected_filter_index();

    let items: Vec<ListItem> = app
        .controller
        .filter_options()
        .iter()
        .enumerate()
        .map(|(i, option)| {
            // Truncate name if too long (use chars to avoid UTF-8 panics)
            let label = truncate_chars(&strip_control(&option.label), 24);
            if i == active {
                ListItem::new(format!("* {}", label)).style(Style::default().fg(Color::Green))
            } else {
                ListItem::new(format!("  {}", label))
            }
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Podcasts")
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.filter_list_state);
}

fn draw_loading(frame: &mut Frame, area: Rect) {
    let loading = Paragraph::new("Loading episodes...")
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Loading"));

    frame.render_widget(loading, area);
}

fn draw_idle(frame: &mut Frame, keys: &Keybindings, area: Rect) {
    let idle = Paragraph::new(idle_message(keys))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Episodes"))
        .wrap(Wrap { trim: true });

    frame.render_widget(idle, area);
}

fn draw_empty_state(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.controller.is_loading() {
        "Episodes (loading...)"
    } else {
        "Episodes"
    };
    let empty = Paragraph::new(empty_message(&app.keybindings))
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL).title(title))
    .wrap(Wrap { trim: true });

    frame.render_widget(empty, area);
}

fn idle_message(keys: &Keybindings) -> String {
    format!(
        "Could not load episodes yet. Press [{}] to refresh or wait for the next reload.",
        Keybindings::label(&keys.refresh)
    )
}

fn empty_message(keys: &Keybindings) -> String {
    format!(
        "No pending episodes\n\nEverything here has been listened to. Press [{}] to check the feeds again.",
        Keybindings::label(&keys.refresh)
    )
}

fn draw_episodes(frame: &mut Frame, app: &mut App, cards: &[EpisodeCard], area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let items: Vec<ListItem> = cards
        .iter()
        .map(|card| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        strip_control(&card.podcast_name),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        strip_control(&card.title),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("  {}", strip_control(&card.meta())),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let title = match app.controller.pagination() {
        Some(p) if app.controller.is_loading() => format!("Episodes - {} (loading...)", p.label()),
        Some(p) => format!("Episodes - {}", p.label()),
        None => "Episodes".to_string(),
    };

    let border_style = if app.focus == Focus::Episodes {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], &mut app.episode_list_state);

    let details = app
        .episode_list_state
        .selected()
        .and_then(|i| cards.get(i))
        .map(|card| details_text(card, &app.keybindings))
        .unwrap_or_default();

    let details_widget = Paragraph::new(details)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: true });

    frame.render_widget(details_widget, chunks[1]);
}

fn details_text<'a>(card: &EpisodeCard, keys: &Keybindings) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(Span::styled(
            strip_control(&card.title),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(strip_control(&card.podcast_name)),
        Line::from(Span::styled(
            strip_control(&card.meta()),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    if let Some(description) = &card.description {
        lines.push(Line::from(strip_control(description)));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(vec![
        Span::styled(
            format!("[{}] {}", Keybindings::label(&keys.open), card.link.label),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            strip_control(&card.link.url),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    lines.push(Line::from(Span::styled(
        format!(
            "[{}] Mark as listened",
            Keybindings::label(&keys.mark_listened)
        ),
        Style::default().fg(Color::Cyan),
    )));
    lines
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = &app.keybindings;
    let enabled = Style::default().fg(Color::White);
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    if let Some(p) = app.controller.pagination() {
        spans.push(Span::styled(
            "← Prev",
            if p.previous_enabled { enabled } else { disabled },
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(p.label(), Style::default().fg(Color::Cyan)));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "Next →",
            if p.next_enabled { enabled } else { disabled },
        ));
        spans.push(Span::raw("    "));
    }

    match &app.status_message {
        Some(status) => spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => spans.push(Span::styled(
            format!(
                "[{}/{}] page  [{}] filter  [{}] listened  [{}] open  [{}] refresh  [{}] help  [{}] quit",
                Keybindings::label(&keys.previous_page),
                Keybindings::label(&keys.next_page),
                Keybindings::label(&keys.toggle_focus),
                Keybindings::label(&keys.mark_listened),
                Keybindings::label(&keys.open),
                Keybindings::label(&keys.refresh),
                Keybindings::label(&keys.help),
                Keybindings::label(&keys.quit),
            ),
            disabled,
        )),
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

fn draw_notification(frame: &mut Frame, message: &str, kind: NotificationKind) {
    let (title, color) = match kind {
        NotificationKind::Info => ("Notice", Color::Green),
        NotificationKind::Error => ("Error", Color::Red),
    };

    let full = frame.area();
    let width = full.width.min(60);
    let area = Rect {
        x: full.x + full.width.saturating_sub(width + 1),
        y: full.y + 1,
        width,
        height: 4.min(full.height),
    };
    frame.render_widget(Clear, area);

    let popup = Paragraph::new(strip_control(message))
        .style(Style::default().fg(color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(color)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(popup, area);
}

fn draw_help_modal(frame: &mut Frame, keys: &Keybindings) {
    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);

    let help_text = Paragraph::new(help_content(keys))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_text, area);
}

fn help_content(keys: &Keybindings) -> String {
    let row = |binding: &[String], text: &str| format!("  {:<12}{}\n", binding.join(" / "), text);

    let mut content = String::from("Global Commands\n───────────────\n");
    content.push_str(&row(&keys.help, "Show/hide this help"));
    content.push_str("  Ctrl+C      Force quit\n");
    content.push_str(&row(&keys.quit, "Quit"));
    content.push_str(&row(&keys.toggle_focus, "Switch between podcasts and episodes"));
    content.push_str(&row(&keys.refresh, "Refresh all feeds on the server"));
    content.push_str(&row(&keys.next_page, "Next page"));
    content.push_str(&row(&keys.previous_page, "Previous page"));
    content.push_str("  Esc         Dismiss notification\n\n");

    content.push_str("Episodes\n────────\n");
    content.push_str(&row(&keys.down, "Move down"));
    content.push_str(&row(&keys.up, "Move up"));
    content.push_str(&row(&keys.select, "Reload details"));
    content.push_str(&row(&keys.mark_listened, "Mark as listened"));
    content.push_str(&row(&keys.open, "Open link (Spotify when available)"));
    content.push_str(&row(&keys.export, "Export page as HTML"));
    content.push('\n');

    content.push_str("Podcasts\n────────\n");
    content.push_str(&row(&keys.select, "Filter by podcast"));
    content.push('\n');
    let _ = write!(content, "Press {} to close", Keybindings::label(&keys.help));
    content
}

/// Helper function to create a centered rect.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

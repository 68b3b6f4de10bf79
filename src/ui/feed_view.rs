use chrono::Utc;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use super::{theme, util};
use crate::app::{App, FeedPane};
use crate::data::formatter::{Description, RenderResult};
use crate::model::feed::FeedEvent;

pub fn draw_feed(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    draw_event_list(f, chunks[0], app);
    draw_event_detail(f, chunks[1], app);
}

fn border_style(active: bool) -> ratatui::style::Style {
    if active {
        theme::BORDER_ACTIVE
    } else {
        theme::BORDER_INACTIVE
    }
}

fn draw_event_list(f: &mut Frame, area: Rect, app: &App) {
    let state = app.feed();
    let count = state.map(|s| s.rows.len()).unwrap_or(0);
    let block = Block::default()
        .title(format!(" {} [{}] ", app.active_tab.label(), count))
        .borders(Borders::ALL)
        .border_style(border_style(app.pane == FeedPane::List));

    let Some(state) = state.filter(|s| !s.rows.is_empty()) else {
        let loading = state.map(|s| s.loading || !s.loaded).unwrap_or(true);
        let msg = if loading { "Loading..." } else { "No events" };
        f.render_widget(
            Paragraph::new(msg).style(theme::EMPTY_STATE).block(block),
            area,
        );
        return;
    };

    // Room inside the borders and the highlight symbol.
    let width = area.width.saturating_sub(2) as usize;
    let now = Utc::now();
    let items: Vec<ListItem> = state
        .events
        .iter()
        .zip(&state.rows)
        .map(|(event, row)| ListItem::new(row_lines(event, row, width, now)))
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.index.min(count - 1)));

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::LIST_SELECTED);
    f.render_stateful_widget(list, area, &mut list_state);
}

/// Title line with a right-aligned age, then the description lines.
/// Rows whose title and description are both empty show the event type.
fn row_lines(
    event: &FeedEvent,
    row: &RenderResult,
    width: usize,
    now: chrono::DateTime<Utc>,
) -> Vec<Line<'static>> {
    let age = event
        .created_at
        .map(|at| util::relative_time(at, now))
        .unwrap_or_default();
    let title = if row.title.is_empty() && row.description.is_hidden() {
        event.type_name().to_string()
    } else {
        row.title.clone()
    };
    let title_style = if row.title.is_empty() {
        theme::EVENT_TYPE
    } else {
        theme::EVENT_TITLE
    };

    let room = width.saturating_sub(age.chars().count() + 1);
    let title = util::fit_width(&title, room);
    let gap = width.saturating_sub(title.chars().count() + age.chars().count());

    let mut lines = vec![Line::from(vec![
        Span::styled(title, title_style),
        Span::raw(" ".repeat(gap)),
        Span::styled(age, theme::EVENT_TIME),
    ])];
    lines.extend(description_lines(&row.description, width));
    lines
}

fn description_lines(description: &Description, width: usize) -> Vec<Line<'static>> {
    let indent = "  ";
    let room = width.saturating_sub(indent.len());
    match description {
        Description::Hidden => Vec::new(),
        Description::Text(text) => text
            .lines()
            .map(|l| {
                Line::from(vec![
                    Span::raw(indent),
                    Span::styled(util::fit_width(l, room), theme::EVENT_DESC),
                ])
            })
            .collect(),
        Description::Commits { lines, more } => {
            let mut out: Vec<Line> = lines
                .iter()
                .map(|c| {
                    let msg_room = room.saturating_sub(c.short_sha.len() + 1);
                    Line::from(vec![
                        Span::raw(indent),
                        Span::styled(c.short_sha.clone(), theme::COMMIT_SHA),
                        Span::raw(" "),
                        Span::styled(util::fit_width(&c.message, msg_room), theme::EVENT_DESC),
                    ])
                })
                .collect();
            if let Some(more) = more {
                out.push(Line::from(vec![
                    Span::raw(indent),
                    Span::styled(more.clone(), theme::EVENT_TIME),
                ]));
            }
            out
        }
        Description::CommitComment {
            prefix, short_sha, ..
        } => vec![Line::from(vec![
            Span::raw(indent),
            Span::styled(prefix.clone(), theme::EVENT_DESC),
            Span::styled(short_sha.clone(), theme::LINK),
        ])],
    }
}

fn draw_event_detail(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Event ")
        .borders(Borders::ALL)
        .border_style(border_style(app.pane == FeedPane::Detail));

    let (Some(event), Some(row)) = (app.selected_event(), app.selected_row()) else {
        f.render_widget(
            Paragraph::new("Select an event to view details")
                .style(theme::EMPTY_STATE)
                .block(block),
            area,
        );
        return;
    };

    let scroll = app.feed().map(|s| s.detail_scroll).unwrap_or(0);
    let lines = detail_lines(event, row);
    let max_scroll = lines.len().saturating_sub(1);
    let scroll = scroll.min(max_scroll) as u16;

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

fn detail_lines(event: &FeedEvent, row: &RenderResult) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    if !row.title.is_empty() {
        lines.push(Line::from(Span::styled(row.title.clone(), theme::EVENT_TITLE)));
        lines.push(Line::from(""));
    }

    let field = |label: &str, value: String, style| {
        Line::from(vec![
            Span::styled(format!("{:<9}", label), theme::HELP_DESC),
            Span::styled(value, style),
        ])
    };

    lines.push(field("Type", event.type_name().to_string(), theme::EVENT_TYPE));
    let actor = match event.actor_attributes.as_ref().and_then(|a| a.name.clone()) {
        Some(name) => format!("{} ({})", event.actor, name),
        None => event.actor.clone(),
    };
    lines.push(field("Actor", actor, theme::LIST_NORMAL));
    if let Some(at) = event.created_at {
        lines.push(field(
            "When",
            at.format("%Y-%m-%d %H:%M UTC").to_string(),
            theme::LIST_NORMAL,
        ));
    }
    if let Some(repo) = &event.repository {
        lines.push(field("Repo", repo.full_name(), theme::LIST_NORMAL));
        if let Some(desc) = repo.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(field("", desc.to_string(), theme::EVENT_DESC));
        }
    } else if let Some(repo) = event.payload_repo().filter(|r| !r.is_empty()) {
        lines.push(field("Repo", repo.to_string(), theme::LIST_NORMAL));
    }
    if let Some(url) = event.link_url() {
        lines.push(field("Link", url, theme::LINK));
    }

    let description = row.description.lines();
    if !description.is_empty() {
        lines.push(Line::from(""));
        for l in description {
            lines.push(Line::from(Span::styled(l, theme::EVENT_DESC)));
        }
    }
    if let Description::CommitComment { sha, .. } = &row.description {
        lines.push(field("Commit", sha.clone(), theme::COMMIT_SHA));
    }
    lines
}

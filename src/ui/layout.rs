use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::{chooser_modal, feed_view, help_overlay, tabs, theme};
use crate::app::{App, FeedPane};

pub fn draw_layout(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(3),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    tabs::draw_tab_bar(f, chunks[0], app);
    draw_content(f, chunks[1], app);
    draw_status_bar(f, chunks[2], app);

    // Handler chooser
    if let Some(chooser) = &app.chooser {
        chooser_modal::draw_chooser(f, f.area(), chooser);
    }

    // Help overlay (on top of everything)
    if app.show_help {
        help_overlay::draw_help(f, f.area());
    }
}

fn draw_content(f: &mut Frame, area: Rect, app: &App) {
    if app.visible_tabs().is_empty() {
        let msg = "No feeds available. Install and log in to gh, or pass --file <events.json>.";
        f.render_widget(Paragraph::new(msg).style(theme::EMPTY_STATE), area);
        return;
    }
    feed_view::draw_feed(f, area, app);
}

fn hint_text(app: &App) -> Vec<(&'static str, &'static str)> {
    let mut hints = if app.chooser.is_some() {
        vec![("j/k", "nav"), ("Enter", "open"), ("Esc", "cancel")]
    } else {
        match app.pane {
            FeedPane::List => vec![
                ("j/k", "nav"),
                ("Enter", "detail"),
                ("o", "open"),
                ("u", "actor"),
                ("r", "refresh"),
            ],
            FeedPane::Detail => vec![("j/k", "scroll"), ("o", "open"), ("h", "list")],
        }
    };
    hints.push(("^H", "help"));
    hints
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut left_spans: Vec<Span> = Vec::new();

    if let Some(ref err) = app.last_error {
        left_spans.push(Span::styled(format!(" ERR: {} ", err), theme::STATUS_ERROR));
    }

    if let Some((msg, _)) = &app.notice {
        left_spans.push(Span::styled(format!(" {} ", msg), theme::STATUS_NOTICE));
    }

    if app.feed().map(|s| s.loading).unwrap_or(false) {
        left_spans.push(Span::styled(" LOADING ", theme::STATUS_LOADING));
    }

    // Build right-aligned hint spans
    let hints = hint_text(app);
    let mut hint_spans: Vec<Span> = Vec::new();
    for (i, (key, desc)) in hints.iter().enumerate() {
        if i > 0 {
            hint_spans.push(Span::styled("  ", theme::STATUS_BAR));
        }
        hint_spans.push(Span::styled(*key, theme::HINT_KEY));
        hint_spans.push(Span::styled(":", theme::HINT_DESC));
        hint_spans.push(Span::styled(*desc, theme::HINT_DESC));
    }
    hint_spans.push(Span::styled(" ", theme::STATUS_BAR));

    let left_width: usize = left_spans.iter().map(|s| s.width()).sum();
    let hint_width: usize = hint_spans.iter().map(|s| s.width()).sum();
    let total = area.width as usize;
    let gap = total.saturating_sub(left_width + hint_width);

    let mut spans = left_spans;
    spans.push(Span::styled(" ".repeat(gap), theme::STATUS_BAR));
    spans.extend(hint_spans);

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::theme;
use crate::app::App;

pub fn draw_tab_bar(f: &mut Frame, area: Rect, app: &App) {
    let visible = app.visible_tabs();

    let mut spans = Vec::new();
    for (i, tab) in visible.iter().enumerate() {
        let num = i + 1;
        let state = app.feeds.get(tab);
        let new_activity = state.map(|s| s.new_activity).unwrap_or(false);
        let label = match state {
            Some(s) if s.loaded => format!("{}:{} ({})", num, tab.label(), s.rows.len()),
            _ => format!("{}:{}", num, tab.label()),
        };
        let label = if new_activity {
            format!("{}*", label)
        } else {
            label
        };

        let style = if *tab == app.active_tab {
            theme::TAB_ACTIVE
        } else if new_activity {
            theme::TAB_BADGE
        } else {
            theme::TAB_INACTIVE
        };
        spans.push(Span::styled(format!(" {} ", label), style));
        spans.push(Span::raw(" "));
    }

    let version = format!("octofeed v{}", env!("CARGO_PKG_VERSION"));
    let tabs_width: usize = spans.iter().map(|s| s.width()).sum();
    let total_used = tabs_width + version.len();
    let pad = (area.width as usize).saturating_sub(total_used);
    if pad > 0 {
        spans.push(Span::raw(" ".repeat(pad)));
    }
    spans.push(Span::styled(version, theme::STATUS_BAR));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

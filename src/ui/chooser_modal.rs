use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};
use ratatui::Frame;

use super::{theme, util};
use crate::app::ChooserState;

/// Draw the "open with" dialog listing candidate handlers.
pub fn draw_chooser(f: &mut Frame, area: Rect, chooser: &ChooserState) {
    let width = 56u16.min(area.width.saturating_sub(4));
    let height = (chooser.candidates.len() as u16 + 4).min(area.height.saturating_sub(2));

    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(area.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vert[1]);

    let popup_area = horiz[1];
    f.render_widget(Clear, popup_area);

    let uri = chooser
        .candidates
        .first()
        .map(|c| c.intent.data.to_string())
        .unwrap_or_default();
    let title = format!(
        " Open {} ",
        util::fit_width(&uri, (width as usize).saturating_sub(10))
    );

    let items: Vec<ListItem> = chooser
        .candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), theme::HELP_KEY),
                Span::styled(c.label.clone(), theme::LIST_NORMAL),
            ]))
        })
        .collect();

    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(vec![
            Span::styled(" Enter", theme::HELP_KEY),
            Span::styled(": open  ", theme::HELP_DESC),
            Span::styled("Esc", theme::HELP_KEY),
            Span::styled(": cancel ", theme::HELP_DESC),
        ]))
        .borders(Borders::ALL)
        .border_style(theme::CHOOSER_BORDER);

    let mut state = ListState::default();
    state.select(Some(chooser.index));

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::LIST_SELECTED);
    f.render_stateful_widget(list, popup_area, &mut state);
}

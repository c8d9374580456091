use crate::app::{App, Focus, LoadState, FILTER_BAR_HEIGHT};
use crate::braille::BrailleCanvas;
use crate::filter::Dimension;
use crate::map::MapLayers;
use crate::popup::{Fragment, Popup, PopupValue};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap},
    Frame,
};

const POPUP_WIDTH: u16 = 64;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(FILTER_BAR_HEIGHT), // Filters
            Constraint::Min(3),                    // Map
            Constraint::Length(1),                 // Status bar
        ])
        .split(area);

    let filter_cells = filter_layout(chunks[0]);
    render_filters(frame, app, &filter_cells);
    render_map(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Overlays, last drawn wins
    if let Some(popup) = app.popup() {
        render_popup(frame, &popup, app.popup_scroll, chunks[1]);
    }
    if let Focus::Filter(dim) = app.focus {
        render_dropdown_list(frame, app, dim, filter_cells[dim.index()], chunks[1]);
    }
    if let Some(message) = &app.alert {
        render_alert(frame, message, area);
    }
}

fn filter_layout(area: Rect) -> [Rect; 3] {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);
    [cells[0], cells[1], cells[2]]
}

fn filter_title(dim: Dimension) -> &'static str {
    match dim {
        Dimension::City => " 1 City ",
        Dimension::Main => " 2 Main product ",
        Dimension::Secondary => " 3 Product ",
    }
}

fn render_filters(frame: &mut Frame, app: &App, cells: &[Rect; 3]) {
    for dim in Dimension::ALL {
        let dropdown = app.dropdown(dim);
        let focused = app.focus == Focus::Filter(dim);
        let border = if focused { Color::Yellow } else { Color::DarkGray };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(Span::styled(filter_title(dim), Style::default().fg(Color::Cyan)));

        let value_style = if dropdown.value().is_some() {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let line = Line::from(vec![
            Span::styled(dropdown.label().to_string(), value_style),
            Span::styled(" ▾", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line).block(block), cells[dim.index()]);
    }
}

/// Rows for a bordered list of `entries`, limited to `room`
fn list_height(entries: usize, room: u16) -> u16 {
    u16::try_from(entries)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(room)
}

fn render_dropdown_list(frame: &mut Frame, app: &App, dim: Dimension, anchor: Rect, map_area: Rect) {
    let dropdown = app.dropdown(dim);
    let area = Rect {
        x: anchor.x,
        y: map_area.y,
        width: anchor.width,
        height: list_height(dropdown.len(), map_area.height),
    };

    let items: Vec<ListItem> = dropdown
        .entries()
        .enumerate()
        .map(|(idx, entry)| {
            let style = if idx == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Span::styled(entry.to_string(), style))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black))
        .highlight_symbol("› ");

    let mut state = ListState::default().with_selected(Some(dropdown.cursor()));
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.dataset() {
        Some(dataset) => format!(" Suppliers {}/{} ", app.map_renderer.markers.len(), dataset.len()),
        None => " Suppliers ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.map_renderer.render(inner.width as usize, inner.height as usize, &viewport);

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Braille map with marker labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    /// Copy the dots of one layer into the buffer in `color`
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (cx, cy, glyph) in canvas.occupied() {
            if cx >= area.width as usize || cy >= area.height as usize {
                continue;
            }
            buf[(area.x + cx as u16, area.y + cy as u16)].set_char(glyph).set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(&self.layers.coastlines, Color::Blue, area, buf);
        Self::render_layer(&self.layers.borders, Color::DarkGray, area, buf);
        Self::render_layer(&self.layers.markers, Color::Red, area, buf);
        Self::render_layer(&self.layers.highlight, Color::Yellow, area, buf);

        for label in &self.layers.labels {
            if label.y >= area.height || label.x >= area.width {
                continue;
            }
            let style = if label.selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            // Truncate at the panel edge
            let max_len = (area.width - label.x) as usize;
            let x = area.x + label.x;
            let y = area.y + label.y;
            for (i, ch) in label.text.chars().take(max_len.min(32)).enumerate() {
                buf[(x + i as u16, y)].set_char(ch).set_style(style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

/// Popup body as styled lines
fn popup_text(popup: &Popup, width: usize) -> Text<'static> {
    let mut lines = Vec::new();

    if let Some(title) = &popup.title {
        lines.push(Line::styled(
            title.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::styled("─".repeat(width), Style::default().fg(Color::DarkGray)));
    }

    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    for row in &popup.rows {
        lines.push(Line::styled(row.field.clone(), key_style));
        match &row.value {
            PopupValue::Lines(fragments) => {
                for fragment in fragments {
                    lines.push(Line::from(fragment_spans(fragment)));
                }
            }
            PopupValue::List { items, multicolumn: false } => {
                lines.extend(items.iter().map(|item| Line::from(format!("  • {item}"))));
            }
            PopupValue::List { items, multicolumn: true } => {
                let column = width.saturating_sub(4) / 2;
                let half = items.len().div_ceil(2);
                for i in 0..half {
                    let left = truncate(&format!("• {}", items[i]), column);
                    let right = items
                        .get(i + half)
                        .map(|item| truncate(&format!("• {item}"), column))
                        .unwrap_or_default();
                    lines.push(Line::from(format!("  {left:<column$}{right}")));
                }
            }
        }
    }

    Text::from(lines)
}

fn fragment_spans(fragment: &Fragment) -> Vec<Span<'static>> {
    match fragment {
        Fragment::Text(text) => vec![Span::raw(format!("  {text}"))],
        Fragment::Link { label, href } => {
            let mut spans = vec![
                Span::raw("  "),
                Span::styled(
                    label.clone(),
                    Style::default().fg(Color::LightBlue).add_modifier(Modifier::UNDERLINED),
                ),
            ];
            if href != label {
                spans.push(Span::styled(format!("  {href}"), Style::default().fg(Color::DarkGray)));
            }
            spans
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Clamp a requested scroll so at least the last line stays in view
fn clamp_scroll(requested: u16, lines: usize) -> u16 {
    let last = u16::try_from(lines.saturating_sub(1)).unwrap_or(u16::MAX);
    requested.min(last)
}

fn render_popup(frame: &mut Frame, popup: &Popup, scroll: u16, map_area: Rect) {
    let width = POPUP_WIDTH.min(map_area.width.saturating_sub(2));
    let area = Rect {
        x: map_area.x + map_area.width.saturating_sub(width + 1),
        y: map_area.y + 1,
        width,
        height: map_area.height.saturating_sub(2),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(" Supplier ", Style::default().fg(Color::Yellow)))
        .title_bottom(Span::styled(
            " Enter: close  j/k: scroll ",
            Style::default().fg(Color::DarkGray),
        ));

    let text = popup_text(popup, width.saturating_sub(2) as usize);
    frame.render_widget(Clear, area);
    let scroll = clamp_scroll(scroll, text.lines.len());
    frame.render_widget(
        Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

fn render_alert(frame: &mut Frame, message: &str, area: Rect) {
    let width = area.width.min(60);
    let height = area.height.min(9);
    let rect = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            " Error ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Span::styled(" Enter: dismiss ", Style::default().fg(Color::DarkGray)));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(message.to_string()).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;
    let dim = Style::default().fg(Color::DarkGray);

    let state = match &app.load_state {
        LoadState::Loading => Span::styled(" loading… ", Style::default().fg(Color::Yellow)),
        LoadState::Failed => Span::styled(" no data ", Style::default().fg(Color::Red)),
        LoadState::Ready(_) => Span::styled(
            format!(" {} shown ", app.map_renderer.markers.len()),
            Style::default().fg(Color::Green),
        ),
    };

    // The key hint never changes; only the color shows the state
    let toggle = |on: bool, text: &'static str| {
        Span::styled(
            text,
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };

    let status = Line::from(vec![
        state,
        Span::styled("| Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", dim),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", dim),
        toggle(settings.show_borders, "[b]orders "),
        toggle(settings.show_labels, "[L]abels "),
        Span::styled("| ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | 1-3:filter tab:next enter:popup f:fit hjkl:pan +/-:zoom q:quit",
            dim,
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::popup::PopupRow;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Москва", 10), "Москва");
        assert_eq!(truncate("Нижний Новгород", 6), "Нижни…");
    }

    #[test]
    fn test_list_height_saturates() {
        assert_eq!(list_height(3, 30), 5);
        assert_eq!(list_height(100, 30), 30);
        assert_eq!(list_height(usize::MAX, u16::MAX), u16::MAX);
        assert_eq!(list_height(70_000, 40), 40);
    }

    fn status_line(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..160u16).map(|x| buffer[(x, 29u16)].symbol()).collect()
    }

    #[test]
    fn test_status_hints_name_the_real_keys() {
        let mut app = App::new(160, 30, Settings::default()).unwrap();
        let shown = status_line(&app);
        assert!(shown.contains("[L]abels"), "{shown}");
        assert!(shown.contains("[b]orders"), "{shown}");

        app.map_renderer.toggle_labels();
        app.map_renderer.toggle_borders();
        let hidden = status_line(&app);
        assert!(hidden.contains("[L]abels"), "{hidden}");
        assert!(hidden.contains("[b]orders"), "{hidden}");
    }

    #[test]
    fn test_clamp_scroll() {
        assert_eq!(clamp_scroll(0, 0), 0);
        assert_eq!(clamp_scroll(3, 10), 3);
        assert_eq!(clamp_scroll(40, 10), 9);
    }

    #[test]
    fn test_multicolumn_list_splits_in_half() {
        let popup = Popup {
            title: Some("Завод".into()),
            rows: vec![PopupRow {
                field: "Продукция".into(),
                value: PopupValue::List {
                    items: (1..=9).map(|i| format!("p{i}")).collect(),
                    multicolumn: true,
                },
            }],
        };
        let text = popup_text(&popup, 24);
        // title, rule, field name, then ceil(9 / 2) rows
        assert_eq!(text.lines.len(), 3 + 5);
        let first: String = text.lines[3].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(first.starts_with("  • p1"));
        assert!(first.ends_with("• p6"));
    }
}

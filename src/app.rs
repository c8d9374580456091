use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::dataset::{Dataset, LoadError};
use crate::filter::{Dimension, Reconciler, Selection};
use crate::map::{Lod, MapRenderer, Viewport};
use crate::popup::{FormatTable, Popup};
use crate::select::{Choice, Dropdown};

/// Rows taken by the filter bar above the map
pub const FILTER_BAR_HEIGHT: u16 = 3;

/// Click radius for picking a marker, in braille pixels
const PICK_RADIUS: i32 = 4;

/// Lifecycle of the supplier table
pub enum LoadState {
    Loading,
    Failed,
    Ready(Arc<Dataset>),
}

/// Which part of the screen receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Filter(Dimension),
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub settings: Settings,
    pub load_state: LoadState,
    pub focus: Focus,
    /// Whether the selected marker's popup is shown
    pub popup_open: bool,
    /// First popup line shown, in lines
    pub popup_scroll: u16,
    /// Message shown once when loading failed
    pub alert: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Set once a drag actually moved, so release does not count as a click
    dragged: bool,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    filters: [Dropdown; 3],
    reconciler: Reconciler,
    formats: FormatTable,
    pending: Option<Receiver<Result<Dataset, LoadError>>>,
}

impl App {
    pub fn new(width: usize, height: usize, settings: Settings) -> Result<Self> {
        let (pixel_width, pixel_height) = map_pixels(width, height);
        let view = &settings.view;
        let viewport = Viewport::new(view.center_lon, view.center_lat, view.zoom, pixel_width, pixel_height);

        let labels = &settings.labels;
        let filters = [
            Dropdown::new(labels.all_cities.clone()),
            Dropdown::new(labels.all_main_products.clone()),
            Dropdown::new(labels.all_products.clone()),
        ];

        Ok(Self {
            viewport,
            map_renderer: MapRenderer::new(),
            reconciler: Reconciler::from_settings(&settings)?,
            formats: FormatTable::from_settings(&settings),
            settings,
            load_state: LoadState::Loading,
            focus: Focus::Map,
            popup_open: false,
            popup_scroll: 0,
            alert: None,
            should_quit: false,
            last_mouse: None,
            dragged: false,
            mouse_pos: None,
            filters,
            pending: None,
        })
    }

    /// Wait for the background loader on `rx`
    pub fn begin_load(&mut self, rx: Receiver<Result<Dataset, LoadError>>) {
        self.load_state = LoadState::Loading;
        self.pending = Some(rx);
    }

    /// Check the loader without blocking; true once a result was applied
    pub fn poll_load(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(LoadError::Disconnected),
        };
        self.pending = None;
        self.finish_load(result);
        true
    }

    /// Apply the one and only load result
    pub fn finish_load(&mut self, result: Result<Dataset, LoadError>) {
        match result {
            Ok(dataset) => {
                info!(
                    records = dataset.len(),
                    skipped = dataset.skipped(),
                    "supplier table loaded"
                );
                self.load_state = LoadState::Ready(Arc::new(dataset));
                self.apply_filters();
            }
            Err(err) => {
                error!(path = ?err.path(), "failed to load supplier table: {err}");
                self.load_state = LoadState::Failed;
                self.alert = Some(format!("Could not load supplier data.\n\n{err}"));
            }
        }
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        match &self.load_state {
            LoadState::Ready(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load_state, LoadState::Loading)
    }

    pub fn dropdown(&self, dim: Dimension) -> &Dropdown {
        &self.filters[dim.index()]
    }

    fn dropdown_mut(&mut self, dim: Dimension) -> &mut Dropdown {
        &mut self.filters[dim.index()]
    }

    /// Current values of the three dropdowns
    pub fn selection(&self) -> Selection {
        let mut selection = Selection::default();
        for dim in Dimension::ALL {
            selection.set(dim, self.dropdown(dim).value().map(str::to_string));
        }
        selection
    }

    /// Re-derive every dropdown and the marker layer from the current selection
    pub fn apply_filters(&mut self) {
        let Some(dataset) = self.dataset().cloned() else {
            return;
        };
        let selection = self.selection();
        let result = self.reconciler.reconcile(&dataset, &selection);

        for dim in Dimension::ALL {
            let previous = selection.get(dim).map(str::to_string);
            self.dropdown_mut(dim)
                .repopulate(result.options(dim).iter().cloned(), previous.as_deref());
        }

        let placed = self.map_renderer.show_records(
            &dataset,
            &result.visible,
            self.reconciler.columns(),
            &mut self.viewport,
            self.settings.view.fit_padding,
        );
        self.set_popup(false);
        debug!(?selection, markers = placed, "filters applied");
    }

    /// Give keyboard focus to a dropdown and open it
    pub fn open_filter(&mut self, dim: Dimension) {
        for other in Dimension::ALL {
            self.dropdown_mut(other).close();
        }
        self.dropdown_mut(dim).open();
        self.focus = Focus::Filter(dim);
    }

    pub fn close_filter(&mut self) {
        if let Focus::Filter(dim) = self.focus {
            self.dropdown_mut(dim).close();
        }
        self.focus = Focus::Map;
    }

    /// Move the highlight in the focused dropdown
    pub fn move_filter_cursor(&mut self, delta: isize) {
        if let Focus::Filter(dim) = self.focus {
            self.dropdown_mut(dim).move_cursor(delta);
        }
    }

    pub fn filter_cursor_edge(&mut self, last: bool) {
        if let Focus::Filter(dim) = self.focus {
            let dropdown = self.dropdown_mut(dim);
            if last {
                dropdown.cursor_last();
            } else {
                dropdown.cursor_first();
            }
        }
    }

    /// Commit the highlighted entry; only a real change triggers reconciliation
    pub fn choose_filter(&mut self) {
        let Focus::Filter(dim) = self.focus else {
            return;
        };
        self.focus = Focus::Map;
        if self.dropdown_mut(dim).choose() == Choice::Changed {
            self.apply_filters();
        }
    }

    /// Set a dropdown directly, as if the user picked `value` from it
    pub fn select_value(&mut self, dim: Dimension, value: Option<&str>) {
        if self.dropdown_mut(dim).choose_value(value) == Choice::Changed {
            self.apply_filters();
        }
    }

    /// Select the next or previous marker and show its popup
    pub fn cycle_marker(&mut self, forward: bool) {
        let open = self.map_renderer.cycle_selection(forward).is_some();
        self.set_popup(open);
    }

    pub fn toggle_popup(&mut self) {
        let open = !self.popup_open && self.map_renderer.selected.is_some();
        self.set_popup(open);
    }

    pub fn close_popup(&mut self) {
        self.set_popup(false);
    }

    /// Every open or close starts the popup at its top
    fn set_popup(&mut self, open: bool) {
        self.popup_open = open;
        self.popup_scroll = 0;
    }

    /// Scroll the popup body by `delta` lines; the renderer clamps the far end
    pub fn scroll_popup(&mut self, delta: i16) {
        if self.popup_open {
            self.popup_scroll = self.popup_scroll.saturating_add_signed(delta);
        }
    }

    /// Popup content of the selected marker, if shown
    pub fn popup(&self) -> Option<Popup> {
        if !self.popup_open {
            return None;
        }
        let marker = self.map_renderer.selected_marker()?;
        let record = self.dataset()?.get(marker.record)?;
        Some(self.formats.popup(record))
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Fit the view to the visible markers again
    pub fn refit(&mut self) {
        let padding = self.settings.view.fit_padding;
        self.map_renderer.fit_markers(&mut self.viewport, padding);
    }

    /// Back to the configured starting view
    pub fn reset_view(&mut self) {
        let view = &self.settings.view;
        self.viewport.center_lon = view.center_lon;
        self.viewport.center_lat = view.center_lat;
        self.viewport.zoom = view.zoom;
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = map_pixels(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn lod_level(&self) -> &'static str {
        Lod::from_zoom(self.viewport.zoom).as_str()
    }

    /// Whether the map is covered by the alert or an open dropdown
    pub fn map_blocked(&self) -> bool {
        self.alert.is_some() || matches!(self.focus, Focus::Filter(_))
    }

    /// Record where a press started. A press while a dropdown is open only closes it.
    pub fn begin_press(&mut self, col: u16, row: u16) {
        self.last_mouse = None;
        self.dragged = false;
        if self.alert.is_some() {
            return;
        }
        if matches!(self.focus, Focus::Filter(_)) {
            self.close_filter();
            return;
        }
        self.last_mouse = Some((col, row));
    }

    /// Handle mouse drag; only a press that reached the map pans it
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        let Some((last_x, last_y)) = self.last_mouse else {
            return;
        };
        let dx = last_x as i32 - x as i32;
        let dy = last_y as i32 - y as i32;
        if dx != 0 || dy != 0 {
            self.dragged = true;
        }
        // Less sensitive when zoomed out
        let scale = if self.viewport.zoom < 2.0 {
            2
        } else if self.viewport.zoom < 4.0 {
            3
        } else {
            4
        };
        self.pan(dx * scale, dy * scale);
        self.last_mouse = Some((x, y));
    }

    /// Mouse released: a press without movement picks a marker
    pub fn end_press(&mut self, col: u16, row: u16) {
        let was_click = self.last_mouse.is_some() && !self.dragged;
        self.last_mouse = None;
        self.dragged = false;
        if was_click {
            self.click_at(col, row);
        }
    }

    /// Select the marker under a screen position, or close the popup if there is none
    pub fn click_at(&mut self, col: u16, row: u16) {
        if row < FILTER_BAR_HEIGHT + 1 {
            return;
        }
        let (px, py) = screen_to_pixel(col, row);
        match self.map_renderer.nearest_marker(&self.viewport, px, py, PICK_RADIUS) {
            Some(idx) => {
                self.map_renderer.selected = Some(idx);
                self.set_popup(true);
            }
            None => self.set_popup(false),
        }
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Get mouse position in braille pixel coordinates (for rendering the cursor)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos
            .filter(|&(_, row)| row > FILTER_BAR_HEIGHT)
            .map(|(col, row)| screen_to_pixel(col, row))
    }
}

/// Braille pixel size of the map for a terminal of `width` x `height` cells.
///
/// The map loses the filter bar, its own border and the status bar.
fn map_pixels(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2);
    let inner_height = height.saturating_sub(FILTER_BAR_HEIGHT as usize + 3);
    (inner_width * 2, inner_height * 4)
}

/// Terminal cell to braille pixel inside the map border
fn screen_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(FILTER_BAR_HEIGHT + 1) as i32) * 4;
    (px, py)
}

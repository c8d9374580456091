use crate::braille::BrailleCanvas;
use crate::config::Columns;
use crate::dataset::Dataset;
use crate::map::geometry::{draw_cross, draw_dot, draw_line};
use crate::map::markers::{Marker, MarkerLayer};
use crate::map::projection::Viewport;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Level of detail for basemap data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_coastlines: bool,
    pub show_borders: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_borders: true,
            show_labels: true,
        }
    }
}

/// A marker label in character cells
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub selected: bool,
}

/// Everything drawn for one frame, back to front
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub markers: BrailleCanvas,
    pub highlight: BrailleCanvas,
    pub labels: Vec<Label>,
}

/// Basemap linework plus the supplier marker layer
pub struct MapRenderer {
    pub coastlines_low: Vec<LineString>,
    pub coastlines_medium: Vec<LineString>,
    pub coastlines_high: Vec<LineString>,
    pub borders_medium: Vec<LineString>,
    pub borders_high: Vec<LineString>,
    pub markers: MarkerLayer,
    /// Index into `markers` of the marker whose popup is shown
    pub selected: Option<usize>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
            coastlines_high: Vec::new(),
            borders_medium: Vec::new(),
            borders_high: Vec::new(),
            markers: MarkerLayer::new(),
            selected: None,
            settings: DisplaySettings::default(),
        }
    }

    /// Get coastlines for the given LOD, falling back to coarser data
    fn get_coastlines(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High if !self.coastlines_high.is_empty() => &self.coastlines_high,
            Lod::High | Lod::Medium if !self.coastlines_medium.is_empty() => &self.coastlines_medium,
            _ => &self.coastlines_low,
        }
    }

    fn get_borders(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High if !self.borders_high.is_empty() => &self.borders_high,
            _ => &self.borders_medium,
        }
    }

    /// Replace the markers with the given records and fit the view to them.
    ///
    /// With no markers the viewport is left exactly as it was.
    pub fn show_records(
        &mut self,
        dataset: &Dataset,
        visible: &[usize],
        columns: &Columns,
        viewport: &mut Viewport,
        padding: f64,
    ) -> usize {
        self.selected = None;
        let placed = self.markers.place(dataset, visible, columns);
        if let Some(bounds) = self.markers.bounds() {
            viewport.fit_bounds(&bounds, padding);
        }
        placed
    }

    /// Fit the view to the current markers; false when there are none
    pub fn fit_markers(&self, viewport: &mut Viewport, padding: f64) -> bool {
        match self.markers.bounds() {
            Some(bounds) => {
                viewport.fit_bounds(&bounds, padding);
                true
            }
            None => false,
        }
    }

    pub fn selected_marker(&self) -> Option<&Marker> {
        self.selected.and_then(|idx| self.markers.get(idx))
    }

    /// Move the selection forward or back through the markers, wrapping around
    pub fn cycle_selection(&mut self, forward: bool) -> Option<&Marker> {
        let len = self.markers.len();
        if len == 0 {
            self.selected = None;
            return None;
        }
        self.selected = Some(match (self.selected, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(idx), true) => (idx + 1) % len,
            (Some(idx), false) => (idx + len - 1) % len,
        });
        self.selected_marker()
    }

    /// Marker closest to a pixel position, within `max_dist` pixels
    pub fn nearest_marker(&self, viewport: &Viewport, px: i32, py: i32, max_dist: i32) -> Option<usize> {
        self.markers
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let (mx, my) = viewport.project(m.lon, m.lat);
                let (dx, dy) = ((mx - px) as i64, (my - py) as i64);
                (idx, dx * dx + dy * dy)
            })
            .filter(|&(_, dist2)| dist2 <= (max_dist as i64).pow(2))
            .min_by_key(|&(_, dist2)| dist2)
            .map(|(idx, _)| idx)
    }

    /// Render basemap and markers for a canvas of `width` x `height` characters
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut layers = MapLayers {
            coastlines: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            markers: BrailleCanvas::new(width, height),
            highlight: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        };

        if self.settings.show_coastlines {
            for line in self.get_coastlines(lod) {
                draw_linestring(&mut layers.coastlines, line, viewport);
            }
        }

        if self.settings.show_borders {
            for line in self.get_borders(lod) {
                draw_linestring(&mut layers.borders, line, viewport);
            }
        }

        let radius = if viewport.zoom > 30.0 { 2 } else { 1 };

        for (idx, marker) in self.markers.iter().enumerate() {
            let (px, py) = viewport.project(marker.lon, marker.lat);
            if !viewport.is_visible(px, py) {
                continue;
            }
            let selected = self.selected == Some(idx);
            draw_dot(&mut layers.markers, (px, py), radius);
            if selected {
                draw_cross(&mut layers.highlight, (px, py), radius + 3);
            }

            // Labels sit two cells right of the marker
            if (self.settings.show_labels || selected) && px >= 0 && py >= 0 {
                if let Some(text) = &marker.label {
                    let char_x = (px / 2) as u16;
                    let char_y = (py / 4) as u16;
                    if let Some(label_x) = char_x.checked_add(2) {
                        layers.labels.push(Label {
                            x: label_x,
                            y: char_y,
                            text: text.clone(),
                            selected,
                        });
                    }
                }
            }
        }

        layers
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Add border data at a specific LOD
    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::High => self.borders_high.push(line),
            Lod::Low | Lod::Medium => self.borders_medium.push(line),
        }
    }

    /// Check if any basemap data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    pub fn toggle_coastlines(&mut self) {
        self.settings.show_coastlines = !self.settings.show_coastlines;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            // Long jumps are antimeridian wraps, not real segments
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, (prev_x, prev_y), (px, py));
            }
        }

        prev = Some((px, py));
    }
}

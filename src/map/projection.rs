use std::f64::consts::PI;

use crate::map::markers::Bounds;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 100.0;

/// Web Mercator stops being usable near the poles
const MAX_LAT: f64 = 85.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level; 1.0 fits the whole world width into the canvas
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

/// Normalized Mercator x in [0, 1]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized Mercator y in [0, 1], north at 0
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

/// Inverse of [`mercator_y`]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width.max(1) as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        self.center_lat = self.center_lat.clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Keep the point under the cursor fixed
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Fit the viewport around `bounds` grown by `padding` of its span on every side.
    ///
    /// A degenerate box (single point) zooms to the maximum.
    pub fn fit_bounds(&mut self, bounds: &Bounds, padding: f64) {
        let padded = bounds.pad(padding);

        let x0 = mercator_x(padded.min_lon);
        let x1 = mercator_x(padded.max_lon);
        // North maps to smaller y
        let y0 = mercator_y(padded.max_lat);
        let y1 = mercator_y(padded.min_lat);

        self.center_lon = (padded.min_lon + padded.max_lon) / 2.0;
        self.center_lat = inverse_mercator_y((y0 + y1) / 2.0).clamp(-MAX_LAT, MAX_LAT);

        if self.width == 0 || self.height == 0 {
            return;
        }

        let span_x = x1 - x0;
        let span_y = y1 - y0;
        let zoom_x = if span_x > 0.0 { 1.0 / span_x } else { MAX_ZOOM };
        let zoom_y = if span_y > 0.0 {
            self.height as f64 / (self.width as f64 * span_y)
        } else {
            MAX_ZOOM
        };
        self.zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;
        let center_x = mercator_x(self.center_lon);
        let center_y = mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        (x * 360.0 - 180.0, inverse_mercator_y(y))
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.zoom * self.width as f64;

        let px = ((mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0) as i32;
        let py = ((mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Strict version of [`is_visible`](Self::is_visible) without the margin
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(38.1, 55.6, 8.0, 400, 200);
        let (px, py) = vp.project(37.6, 55.7);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 37.6).abs() < 0.2);
        assert!((lat - 55.7).abs() < 0.2);
    }

    #[test]
    fn test_fit_bounds_contains_all_points() {
        let mut vp = Viewport::new(0.0, 20.0, 1.0, 400, 200);
        let points = [(37.6, 55.7), (49.1, 55.8), (35.9, 56.8), (56.2, 58.0)];
        let bounds = Bounds::from_points(points.iter().copied()).unwrap();
        vp.fit_bounds(&bounds, 0.1);

        assert!(vp.zoom > 1.0);
        for (lon, lat) in points {
            let (px, py) = vp.project(lon, lat);
            assert!(vp.contains(px, py), "({lon}, {lat}) -> ({px}, {py})");
        }
    }

    #[test]
    fn test_fit_single_point_zooms_in() {
        let mut vp = Viewport::new(0.0, 20.0, 1.0, 400, 200);
        let bounds = Bounds::from_points([(49.1, 55.8)]).unwrap();
        vp.fit_bounds(&bounds, 0.1);
        assert_eq!(vp.zoom, MAX_ZOOM);
        assert!((vp.center_lon - 49.1).abs() < 1e-9);
        assert!((vp.center_lat - 55.8).abs() < 1e-6);
    }
}

use crate::config::Columns;
use crate::dataset::Dataset;

/// Geographic bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Smallest box around the points; `None` when there are none
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut points = points.into_iter();
        let (lon, lat) = points.next()?;
        let mut bounds = Self::point(lon, lat);
        for (lon, lat) in points {
            bounds.extend(lon, lat);
        }
        Some(bounds)
    }

    /// Grow each side by `ratio` of the span on that axis
    pub fn pad(&self, ratio: f64) -> Self {
        let dlon = (self.max_lon - self.min_lon) * ratio;
        let dlat = (self.max_lat - self.min_lat) * ratio;
        Self {
            min_lon: self.min_lon - dlon,
            min_lat: self.min_lat - dlat,
            max_lon: self.max_lon + dlon,
            max_lat: self.max_lat + dlat,
        }
    }
}

/// A placed supplier marker
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub lon: f64,
    pub lat: f64,
    /// Index of the record in the dataset
    pub record: usize,
    /// Permanent label drawn to the right of the marker
    pub label: Option<String>,
}

/// Marker layer, rebuilt wholesale on every filter change
#[derive(Debug, Clone, Default)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn add(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// Replace every marker with one per listed record that has finite coordinates
    pub fn place(&mut self, dataset: &Dataset, visible: &[usize], columns: &Columns) -> usize {
        self.clear();
        for &idx in visible {
            let Some(record) = dataset.get(idx) else {
                continue;
            };
            let (lon, lat) = (record.lon(), record.lat());
            if !lon.is_finite() || !lat.is_finite() {
                continue;
            }
            self.add(Marker {
                lon,
                lat,
                record: idx,
                label: record.non_empty(&columns.name).map(str::to_string),
            });
        }
        self.markers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Marker> {
        self.markers.get(idx)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.markers.iter().map(|m| (m.lon, m.lat)))
    }
}

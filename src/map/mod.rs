mod geometry;
mod markers;
mod projection;
mod renderer;

pub use markers::{Bounds, Marker, MarkerLayer};
pub use projection::{Viewport, MAX_ZOOM, MIN_ZOOM};
pub use renderer::{Label, LineString, Lod, MapLayers, MapRenderer};

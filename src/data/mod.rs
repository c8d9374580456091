//! Basemap linework under the supplier markers.

use crate::map::{LineString, Lod, MapRenderer};
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Coastline files by resolution
const COASTLINE_FILES: [(&str, Lod); 4] = [
    ("ne_110m_coastline.json", Lod::Low),
    ("natural-earth.json", Lod::Medium),
    ("ne_50m_coastline.json", Lod::Medium),
    ("ne_10m_coastline.json", Lod::High),
];

/// Country border files by resolution
const BORDER_FILES: [(&str, Lod); 2] = [
    ("ne_50m_borders.json", Lod::Medium),
    ("ne_10m_borders.json", Lod::High),
];

/// Load every Natural Earth file present in `data_dir`; returns how many were read.
///
/// Missing files are skipped, unreadable ones are logged and skipped.
pub fn load_basemap(renderer: &mut MapRenderer, data_dir: &Path) -> usize {
    let mut loaded = 0;

    for (filename, lod) in COASTLINE_FILES {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match load_lines(&path) {
            Ok(lines) => {
                debug!(file = filename, lines = lines.len(), "loaded coastlines");
                lines.into_iter().for_each(|line| renderer.add_coastline(line, lod));
                loaded += 1;
            }
            Err(err) => warn!(file = filename, "failed to load coastlines: {err:#}"),
        }
    }

    for (filename, lod) in BORDER_FILES {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match load_lines(&path) {
            Ok(lines) => {
                debug!(file = filename, lines = lines.len(), "loaded borders");
                lines.into_iter().for_each(|line| renderer.add_border(line, lod));
                loaded += 1;
            }
            Err(err) => warn!(file = filename, "failed to load borders: {err:#}"),
        }
    }

    info!(dir = %data_dir.display(), files = loaded, "basemap loaded");
    loaded
}

/// Load the basemap, falling back to the built-in outline when nothing usable was found
pub fn load_basemap_or_fallback(renderer: &mut MapRenderer, data_dir: &Path) {
    if data_dir.exists() {
        load_basemap(renderer, data_dir);
    }
    if !renderer.has_data() {
        info!("no basemap files found, using built-in outline");
        generate_simple_world(renderer);
    }
}

/// Read all line features from a GeoJSON file
fn load_lines(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parse {}", path.display()))?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|coords| add_line(to_line(coords))),
        // Only exterior rings; holes add nothing at terminal resolution
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Rough outline of Europe and northern Asia for when no data files are available
pub fn generate_simple_world(renderer: &mut MapRenderer) {
    // Baltic to the Pacific along the Arctic coast
    renderer.add_coastline(
        vec![
            (5.0, 58.0), (8.0, 63.0), (14.0, 68.0), (20.0, 70.0), (28.0, 71.0),
            (33.0, 69.0), (41.0, 67.0), (44.0, 68.0), (53.0, 68.5), (60.0, 69.5),
            (66.0, 69.0), (73.0, 72.5), (80.0, 73.5), (87.0, 75.0), (100.0, 77.0),
            (113.0, 73.5), (128.0, 72.5), (140.0, 72.0), (152.0, 70.5), (161.0, 69.5),
            (170.0, 70.0), (180.0, 68.5),
        ],
        Lod::Low,
    );

    // Pacific coast down to Korea and China
    renderer.add_coastline(
        vec![
            (180.0, 65.0), (177.0, 62.5), (170.0, 60.0), (163.0, 59.0), (160.0, 54.0),
            (156.0, 51.0), (156.0, 57.5), (150.0, 59.5), (142.0, 59.0), (137.0, 54.0),
            (140.5, 48.5), (133.0, 43.0), (129.5, 41.0), (129.0, 35.0), (126.0, 35.0),
            (125.0, 40.0), (121.0, 40.5), (117.5, 38.5), (122.0, 31.0), (119.0, 25.0),
        ],
        Lod::Low,
    );

    // Baltic, western Europe and the Mediterranean to the Black Sea
    renderer.add_coastline(
        vec![
            (30.0, 60.0), (23.0, 59.5), (21.5, 57.0), (21.0, 55.0), (14.0, 54.0),
            (10.0, 54.5), (8.5, 55.5), (8.0, 53.5), (4.0, 52.0), (1.5, 50.5),
            (-4.5, 48.5), (-1.5, 46.0), (-1.5, 43.5), (-9.0, 43.0), (-9.0, 37.0),
            (-5.5, 36.0), (-0.5, 38.5), (3.0, 42.5), (7.0, 43.5), (12.5, 44.0),
            (10.0, 44.0), (12.0, 41.5), (16.0, 38.0), (18.5, 40.0), (13.5, 45.5),
            (19.5, 42.0), (23.0, 37.0), (26.0, 40.5), (29.0, 41.0),
        ],
        Lod::Low,
    );

    // Black Sea
    renderer.add_coastline(
        vec![
            (29.0, 41.0), (28.0, 43.5), (30.5, 46.5), (33.5, 46.0), (33.5, 44.5),
            (36.5, 45.5), (38.0, 44.5), (41.5, 41.5), (36.0, 41.5), (29.0, 41.0),
        ],
        Lod::Low,
    );

    // Caspian Sea
    renderer.add_coastline(
        vec![
            (47.0, 44.5), (49.0, 46.5), (53.0, 46.5), (53.0, 42.0), (54.0, 37.5),
            (50.0, 37.0), (49.0, 40.0), (47.0, 44.5),
        ],
        Lod::Low,
    );

    // Scandinavian peninsula
    renderer.add_coastline(
        vec![
            (5.0, 58.0), (7.5, 58.0), (10.5, 59.0), (12.0, 56.5), (14.5, 56.0),
            (16.5, 57.0), (18.5, 59.5), (17.5, 62.5), (21.0, 64.5), (24.0, 65.5),
            (21.5, 62.0), (23.0, 60.0), (30.0, 60.0),
        ],
        Lod::Low,
    );
}

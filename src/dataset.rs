use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Columns, Settings};

/// Failure to read the supplier table. Reported once, never retried.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: csv::Error },
    #[error("invalid delimiter {0:?}")]
    Delimiter(char),
    #[error("loader thread exited before reporting a result")]
    Disconnected,
}

impl LoadError {
    /// The file the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            LoadError::Open { path, .. } | LoadError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// One supplier row with parsed coordinates.
///
/// Field values are kept as the raw text of the table, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    headers: Arc<[String]>,
    values: Vec<String>,
    lon: f64,
    lat: f64,
}

impl Record {
    /// Build a record, or `None` when latitude or longitude is missing or not a number
    pub fn new(headers: Arc<[String]>, values: Vec<String>, columns: &Columns) -> Option<Self> {
        let lookup = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|idx| values.get(idx))
        };
        let lat = lookup(&columns.latitude).and_then(|v| parse_coordinate(v))?;
        let lon = lookup(&columns.longitude).and_then(|v| parse_coordinate(v))?;

        Some(Self {
            headers,
            values,
            lon,
            lat,
        })
    }

    /// Raw value of a field; `None` if the column is absent or the row is short
    pub fn get(&self, field: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == field)?;
        self.values.get(idx).map(String::as_str)
    }

    /// Non-empty value of a field
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.get(field).filter(|v| !v.is_empty())
    }

    /// (header, value) pairs in table order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

fn decode(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// Parse a coordinate written with a decimal comma or dot
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Immutable snapshot of every usable supplier record
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    records: Vec<Record>,
    skipped: usize,
}

impl Dataset {
    /// Read the table from a file
    pub fn load(path: &Path, settings: &Settings) -> Result<Self, LoadError> {
        let delimiter = settings
            .delimiter_byte()
            .map_err(|_| LoadError::Delimiter(settings.delimiter))?;
        let file = std::fs::File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, delimiter, &settings.columns).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the table from any byte source. Rows without usable coordinates are dropped.
    ///
    /// Cells are decoded lossily, so a mis-encoded byte only garbles its own cell.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8, columns: &Columns) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| decode(h).trim_matches('\u{feff}').trim().to_string())
            .collect();
        let shared: Arc<[String]> = headers.clone().into();

        let mut records = Vec::new();
        let mut skipped = 0;
        for (row, result) in reader.byte_records().enumerate() {
            let raw = result?;
            let values: Vec<String> = raw.iter().map(decode).collect();
            if values.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if values.iter().any(|field| field.contains(char::REPLACEMENT_CHARACTER)) {
                debug!(row = row + 2, "row contains bytes that are not valid UTF-8");
            }
            match Record::new(Arc::clone(&shared), values, columns) {
                Some(record) => records.push(record),
                None => {
                    debug!(row = row + 2, "skipping row without usable coordinates");
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            headers,
            records,
            skipped,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped for missing or malformed coordinates
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Load the dataset on a background thread; the receiver yields exactly one result
pub fn spawn_load(path: PathBuf, settings: Settings) -> Receiver<Result<Dataset, LoadError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        info!(path = %path.display(), "loading supplier table");
        let result = Dataset::load(&path, &settings);
        // The UI may already be gone; nothing to report then
        let _ = tx.send(result);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\u{feff}№;Наименование поставщика;Адрес производства;Основная продукция;Продукция;Latitude;Longitude
1;Завод А;г. Москва, ул. X;Сталь;\"Трубы\nПрофиль\";55,7;37,6

2;Завод Б;г. Казань;Цемент;;55.8;49.1
3;Завод В;г. Тверь;Сталь;;abc;35,9
4;Завод Г;г. Пермь;Цемент;;58,0
";

    fn load(text: &str) -> Dataset {
        Dataset::from_reader(text.as_bytes(), b';', &Columns::default()).unwrap()
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("55,7"), Some(55.7));
        assert_eq!(parse_coordinate(" 37.6 "), Some(37.6));
        assert_eq!(parse_coordinate("-12"), Some(-12.0));
        assert_eq!(parse_coordinate("abc"), None);
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate("inf"), None);
    }

    #[test]
    fn test_rows_without_coordinates_are_dropped() {
        let dataset = load(TABLE);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped(), 2);
        let names: Vec<_> = dataset
            .records()
            .iter()
            .map(|r| r.get("Наименование поставщика").unwrap())
            .collect();
        assert_eq!(names, ["Завод А", "Завод Б"]);
    }

    #[test]
    fn test_bom_stripped_and_multiline_kept() {
        let dataset = load(TABLE);
        assert_eq!(dataset.headers()[0], "№");
        let first = &dataset.records()[0];
        assert_eq!(first.get("№"), Some("1"));
        assert_eq!(first.get("Продукция"), Some("Трубы\nПрофиль"));
        assert_eq!(first.lat(), 55.7);
        assert_eq!(first.lon(), 37.6);
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let dataset = load(TABLE);
        let second = &dataset.records()[1];
        assert_eq!(second.get("Продукция"), Some(""));
        assert_eq!(second.non_empty("Продукция"), None);
        assert_eq!(second.get("Сайт"), None);
    }

    #[test]
    fn test_fields_follow_header_order() {
        let dataset = load(TABLE);
        let keys: Vec<_> = dataset.records()[0].fields().map(|(k, _)| k).collect();
        assert_eq!(keys[..3], ["№", "Наименование поставщика", "Адрес производства"]);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Dataset::load(Path::new("/nonexistent/factories.csv"), &Settings::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert_eq!(err.path(), Some(Path::new("/nonexistent/factories.csv")));
    }

    #[test]
    fn test_mis_encoded_cell_keeps_the_table() {
        // "За" in cp1251 inside an otherwise UTF-8 file
        let mut bytes = "Наименование поставщика;Latitude;Longitude\nЗавод А;55,7;37,6\n".as_bytes().to_vec();
        bytes.extend_from_slice(&[0xC7, 0xE0]);
        bytes.extend_from_slice("вод Б;55,8;49,1\n".as_bytes());

        let dataset = Dataset::from_reader(bytes.as_slice(), b';', &Columns::default()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].get("Наименование поставщика"), Some("Завод А"));
        let garbled = dataset.records()[1].get("Наименование поставщика").unwrap();
        assert!(garbled.contains(char::REPLACEMENT_CHARACTER));
        assert!(garbled.ends_with("вод Б"));
        assert_eq!(dataset.records()[1].lat(), 55.8);
    }

    #[test]
    fn test_spawn_load_reports_once() {
        let rx = spawn_load(PathBuf::from("/nonexistent/factories.csv"), Settings::default());
        assert!(rx.recv().unwrap().is_err());
        assert!(rx.recv().is_err());
    }
}

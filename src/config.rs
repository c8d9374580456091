use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(
    name = "factory-map",
    version,
    about = "Browse factories and suppliers on a terminal map with linked filters"
)]
pub struct Cli {
    /// Path to the delimited supplier table
    #[arg(default_value = "factories.csv")]
    pub data: PathBuf,

    /// Optional TOML file overriding column names, labels and view settings
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory with Natural Earth GeoJSON files for the basemap
    #[arg(short = 'b', long = "basemap", default_value = "data")]
    pub basemap: PathBuf,

    /// Field separator of the supplier table (overrides the config file)
    #[arg(short = 'd', long = "delimiter")]
    pub delimiter: Option<char>,

    /// Where log output goes; the terminal itself belongs to the UI
    #[arg(long = "log-file", default_value = "factory-map.log")]
    pub log_file: PathBuf,
}

/// Header names of the columns the application understands
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Columns {
    pub address: String,
    pub main_product: String,
    pub products: String,
    pub latitude: String,
    pub longitude: String,
    pub name: String,
    pub contacts: String,
    pub website: String,
    pub row_number: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            address: "Адрес производства".into(),
            main_product: "Основная продукция".into(),
            products: "Продукция".into(),
            latitude: "Latitude".into(),
            longitude: "Longitude".into(),
            name: "Наименование поставщика".into(),
            contacts: "Контактное лицо".into(),
            website: "Сайт".into(),
            row_number: "№".into(),
        }
    }
}

/// Placeholder entries shown first in each dropdown
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Labels {
    pub all_cities: String,
    pub all_main_products: String,
    pub all_products: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            all_cities: "All cities".into(),
            all_main_products: "All main products".into(),
            all_products: "All products".into(),
        }
    }
}

/// Initial map view and marker fitting
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewSettings {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
    /// Fraction of the marker bounding box added on every side when fitting
    pub fit_padding: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            center_lon: 38.1,
            center_lat: 55.6,
            zoom: 8.0,
            fit_padding: 0.1,
        }
    }
}

/// Effective application settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub delimiter: char,
    /// Literal that precedes the city name inside an address, e.g. `г. Москва`
    pub city_marker: String,
    /// Product lists longer than this are laid out in two columns
    pub multicolumn_threshold: usize,
    pub columns: Columns,
    pub labels: Labels,
    pub view: ViewSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delimiter: ';',
            city_marker: "г.".into(),
            multicolumn_threshold: 8,
            columns: Columns::default(),
            labels: Labels::default(),
            view: ViewSettings::default(),
        }
    }
}

impl Settings {
    /// Build settings from defaults, the optional config file and CLI overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(delimiter) = cli.delimiter {
            settings.delimiter = delimiter;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The CSV reader wants the separator as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be an ASCII character, got {:?}", self.delimiter);
        }
        Ok(self.delimiter as u8)
    }

    fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.city_marker.trim().is_empty() {
            bail!("city_marker must not be empty");
        }
        if !(0.0..=1.0).contains(&self.view.fit_padding) {
            bail!("view.fit_padding must be between 0 and 1, got {}", self.view.fit_padding);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            delimiter = ","

            [columns]
            address = "Address"

            [view]
            zoom = 3.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.delimiter, ',');
        assert_eq!(settings.columns.address, "Address");
        assert_eq!(settings.columns.latitude, "Latitude");
        assert_eq!(settings.view.zoom, 3.0);
        assert_eq!(settings.view.fit_padding, 0.1);
        assert_eq!(settings.city_marker, "г.");
    }

    #[test]
    fn test_cli_delimiter_overrides_default() {
        let cli = Cli::parse_from(["factory-map", "suppliers.csv", "--delimiter", "\t"]);
        let settings = Settings::load(&cli).unwrap();
        assert_eq!(cli.data, PathBuf::from("suppliers.csv"));
        assert_eq!(settings.delimiter_byte().unwrap(), b'\t');
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let cli = Cli::parse_from(["factory-map", "--delimiter", "§"]);
        assert!(Settings::load(&cli).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["factory-map"]);
        assert_eq!(cli.data, PathBuf::from("factories.csv"));
        assert_eq!(cli.basemap, PathBuf::from("data"));
        assert!(cli.config.is_none());
    }
}

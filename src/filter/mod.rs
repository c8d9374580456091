//! Linked filtering of the supplier table.
//!
//! Each dropdown offers only the values that remain reachable under the
//! *other two* selections, while the visible set honours all three. The
//! whole result is recomputed from the dataset on every change; nothing is
//! cached between calls.

pub mod extract;

pub use extract::{split_lines, unique_values, CityPattern, ExtractMode, OptionSet};

use crate::config::{Columns, Settings};
use crate::dataset::{Dataset, Record};

/// One of the three filter dropdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    City,
    Main,
    Secondary,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::City, Dimension::Main, Dimension::Secondary];

    /// Column the dimension matches against
    pub fn column(self, columns: &Columns) -> &str {
        match self {
            Dimension::City => &columns.address,
            Dimension::Main => &columns.main_product,
            Dimension::Secondary => &columns.products,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Dimension::City => 0,
            Dimension::Main => 1,
            Dimension::Secondary => 2,
        }
    }
}

/// Current value of each dropdown; `None` means unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub city: Option<String>,
    pub main: Option<String>,
    pub secondary: Option<String>,
}

impl Selection {
    pub fn get(&self, dim: Dimension) -> Option<&str> {
        let value = match dim {
            Dimension::City => &self.city,
            Dimension::Main => &self.main,
            Dimension::Secondary => &self.secondary,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, dim: Dimension, value: Option<String>) {
        let slot = match dim {
            Dimension::City => &mut self.city,
            Dimension::Main => &mut self.main,
            Dimension::Secondary => &mut self.secondary,
        };
        *slot = value.filter(|v| !v.is_empty());
    }

    pub fn is_unconstrained(&self) -> bool {
        Dimension::ALL.iter().all(|&dim| self.get(dim).is_none())
    }
}

/// Options for every dropdown plus the records that pass all filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub cities: OptionSet,
    pub main: OptionSet,
    pub secondary: OptionSet,
    /// Dataset indices in dataset order
    pub visible: Vec<usize>,
}

impl Reconciliation {
    pub fn options(&self, dim: Dimension) -> &OptionSet {
        match dim {
            Dimension::City => &self.cities,
            Dimension::Main => &self.main,
            Dimension::Secondary => &self.secondary,
        }
    }
}

/// Applies the filter rules for a fixed column layout and city convention
#[derive(Debug, Clone)]
pub struct Reconciler {
    columns: Columns,
    pattern: CityPattern,
}

impl Reconciler {
    pub fn new(columns: Columns, pattern: CityPattern) -> Self {
        Self { columns, pattern }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, regex::Error> {
        Ok(Self::new(
            settings.columns.clone(),
            CityPattern::new(&settings.city_marker)?,
        ))
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Substring match of one dimension. An empty selection matches everything;
    /// a missing field never matches an active selection.
    pub fn matches(&self, record: &Record, dim: Dimension, selection: &Selection) -> bool {
        match selection.get(dim) {
            None => true,
            Some(wanted) => record
                .non_empty(dim.column(&self.columns))
                .is_some_and(|text| text.contains(wanted)),
        }
    }

    /// True when the record passes every dimension except `skip`
    fn matches_except(&self, record: &Record, skip: Option<Dimension>, selection: &Selection) -> bool {
        Dimension::ALL
            .iter()
            .filter(|&&dim| Some(dim) != skip)
            .all(|&dim| self.matches(record, dim, selection))
    }

    /// Option values for `dim`, constrained by the other two selections only
    pub fn options_for(&self, dataset: &Dataset, dim: Dimension, selection: &Selection) -> OptionSet {
        let relevant = dataset
            .records()
            .iter()
            .filter(|record| self.matches_except(record, Some(dim), selection));
        let mode = match dim {
            Dimension::City => ExtractMode::City(&self.pattern),
            Dimension::Main | Dimension::Secondary => ExtractMode::Lines,
        };
        unique_values(relevant, dim.column(&self.columns), mode)
    }

    /// Indices of the records passing all three filters
    pub fn visible(&self, dataset: &Dataset, selection: &Selection) -> Vec<usize> {
        dataset
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches_except(record, None, selection))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Derive all option sets and the visible subset from scratch
    pub fn reconcile(&self, dataset: &Dataset, selection: &Selection) -> Reconciliation {
        Reconciliation {
            cities: self.options_for(dataset, Dimension::City, selection),
            main: self.options_for(dataset, Dimension::Main, selection),
            secondary: self.options_for(dataset, Dimension::Secondary, selection),
            visible: self.visible(dataset, selection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "Адрес производства;Основная продукция;Продукция;Latitude;Longitude
\"г. Москва, ул. X\";Сталь;\"Трубы\nПрофиль\";55,7;37,6
г. Казань;Цемент;;55,8;49,1
";

    const WIDER: &str = "Адрес производства;Основная продукция;Продукция;Latitude;Longitude
\"г. Москва, ул. X\";Сталь;\"Трубы\nПрофиль\";55,7;37,6
г. Казань;Цемент;;55,8;49,1
г. Тверь;abc;Лист;abc;35,9
\"г. Тверь, пр. Мира\";Сталь;\"Лист\r\nТрубы\";56,8;35,9
пос. Озерный;Цемент;Трубы;56,0;36,0
г. Москва;;Профиль;55,7;37,6
";

    fn reconciler() -> Reconciler {
        Reconciler::new(Columns::default(), CityPattern::new("г.").unwrap())
    }

    fn dataset(table: &str) -> Dataset {
        Dataset::from_reader(table.as_bytes(), b';', &Columns::default()).unwrap()
    }

    fn sel(city: Option<&str>, main: Option<&str>, secondary: Option<&str>) -> Selection {
        Selection {
            city: city.map(String::from),
            main: main.map(String::from),
            secondary: secondary.map(String::from),
        }
    }

    fn set(values: &[&str]) -> OptionSet {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_main_product_selection() {
        let data = dataset(TABLE);
        let result = reconciler().reconcile(&data, &sel(None, Some("Сталь"), None));

        assert_eq!(result.visible, vec![0]);
        assert_eq!(result.cities, set(&["Москва"]));
        assert_eq!(result.secondary, set(&["Профиль", "Трубы"]));
        // Main options ignore the main selection itself
        assert_eq!(result.main, set(&["Сталь", "Цемент"]));
    }

    #[test]
    fn test_exclusive_selections_show_nothing() {
        let data = dataset(TABLE);
        let result = reconciler().reconcile(&data, &sel(Some("Казань"), Some("Сталь"), None));

        assert!(result.visible.is_empty());
        assert_eq!(result.main, set(&["Цемент"]));
        assert_eq!(result.cities, set(&["Москва"]));
        assert!(result.secondary.is_empty());
    }

    #[test]
    fn test_unconstrained_selection_keeps_everything() {
        let data = dataset(WIDER);
        let result = reconciler().reconcile(&data, &Selection::default());

        // The "abc" latitude row never made it into the dataset
        assert_eq!(data.len(), 5);
        assert_eq!(result.visible, vec![0, 1, 2, 3, 4]);
        assert_eq!(result.cities, set(&["Казань", "Москва", "Тверь"]));
        assert_eq!(result.main, set(&["Сталь", "Цемент"]));
        assert_eq!(result.secondary, set(&["Лист", "Профиль", "Трубы"]));
        assert!(!result.main.contains("abc"));
    }

    #[test]
    fn test_visible_is_conjunction_of_substring_matches() {
        let data = dataset(WIDER);
        let r = reconciler();
        let selections = [
            sel(Some("Москва"), None, None),
            sel(None, None, Some("Трубы")),
            sel(Some("Тверь"), Some("Сталь"), Some("Лист")),
            sel(Some("Мос"), None, Some("Проф")),
            sel(None, Some("Цемент"), Some("Трубы")),
        ];

        for selection in &selections {
            let expected: Vec<usize> = data
                .records()
                .iter()
                .enumerate()
                .filter(|(_, record)| {
                    Dimension::ALL.iter().all(|&dim| match selection.get(dim) {
                        None => true,
                        Some(v) => record
                            .get(dim.column(r.columns()))
                            .is_some_and(|text| text.contains(v)),
                    })
                })
                .map(|(idx, _)| idx)
                .collect();
            assert_eq!(r.reconcile(&data, selection).visible, expected, "{selection:?}");
        }
    }

    #[test]
    fn test_empty_field_never_matches_active_selection() {
        let data = dataset(WIDER);
        let result = reconciler().reconcile(&data, &sel(None, Some("Сталь"), None));
        // "г. Москва" with an empty main product stays out
        assert_eq!(result.visible, vec![0, 2]);
    }

    #[test]
    fn test_options_independent_of_own_selection() {
        let data = dataset(WIDER);
        let r = reconciler();
        for dim in Dimension::ALL {
            let mut with = sel(Some("Тверь"), Some("Сталь"), Some("Лист"));
            let base = r.options_for(&data, dim, &with);
            with.set(dim, None);
            assert_eq!(r.options_for(&data, dim, &with), base, "{dim:?}");
            with.set(dim, Some("что-то другое".into()));
            assert_eq!(r.options_for(&data, dim, &with), base, "{dim:?}");
        }
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let data = dataset(WIDER);
        let r = reconciler();
        let selection = sel(None, Some("Цемент"), None);
        assert_eq!(r.reconcile(&data, &selection), r.reconcile(&data, &selection));
    }

    #[test]
    fn test_address_without_marker_contributes_no_city() {
        let data = dataset(WIDER);
        let result = reconciler().reconcile(&data, &sel(None, Some("Цемент"), Some("Трубы")));
        assert_eq!(result.visible, vec![3]);
        assert!(result.cities.is_empty());
    }

    #[test]
    fn test_empty_string_selection_is_unconstrained() {
        let mut selection = Selection::default();
        selection.set(Dimension::City, Some(String::new()));
        assert!(selection.is_unconstrained());
        assert_eq!(selection.city, None);
    }
}

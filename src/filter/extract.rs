use std::collections::BTreeSet;

use regex::Regex;

use crate::dataset::Record;

/// Unique option values, sorted ascending
pub type OptionSet = BTreeSet<String>;

/// Captures the city name that follows a marker such as `г.` up to the next comma
#[derive(Debug, Clone)]
pub struct CityPattern {
    regex: Regex,
}

impl CityPattern {
    pub fn new(marker: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"{}\s*([^,]+)", regex::escape(marker)))?;
        Ok(Self { regex })
    }

    /// City name inside an address, trimmed. Addresses without the marker yield nothing.
    pub fn extract<'a>(&self, address: &'a str) -> Option<&'a str> {
        let city = self.regex.captures(address)?.get(1)?.as_str().trim();
        (!city.is_empty()).then_some(city)
    }
}

/// How candidate values are pulled out of a field
#[derive(Debug, Clone, Copy)]
pub enum ExtractMode<'p> {
    /// Every non-empty trimmed line is a candidate
    Lines,
    /// The city name captured by the pattern is the only candidate
    City(&'p CityPattern),
}

/// Non-empty trimmed lines of a newline-delimited field
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Collect the sorted unique values of `field` across `records`
pub fn unique_values<'r>(
    records: impl IntoIterator<Item = &'r Record>,
    field: &str,
    mode: ExtractMode<'_>,
) -> OptionSet {
    let mut values = OptionSet::new();
    for record in records {
        let Some(text) = record.non_empty(field) else {
            continue;
        };
        match mode {
            ExtractMode::City(pattern) => {
                if let Some(city) = pattern.extract(text) {
                    values.insert(city.to_string());
                }
            }
            ExtractMode::Lines => {
                values.extend(split_lines(text).map(str::to_string));
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Columns;
    use crate::dataset::Dataset;

    fn pattern() -> CityPattern {
        CityPattern::new("г.").unwrap()
    }

    #[test]
    fn test_city_extraction() {
        let p = pattern();
        assert_eq!(p.extract("г. Москва, ул. Ленина, 1"), Some("Москва"));
        assert_eq!(p.extract("Московская обл., г.Подольск"), Some("Подольск"));
        assert_eq!(p.extract("г.   Казань  "), Some("Казань"));
        assert_eq!(p.extract("Тверская обл., пос. Озерный"), None);
        assert_eq!(p.extract("г. , ул. X"), None);
    }

    #[test]
    fn test_marker_is_literal() {
        // "." must not act as a wildcard
        let p = pattern();
        assert_eq!(p.extract("гX Москва"), None);
    }

    #[test]
    fn test_split_lines_handles_crlf() {
        let lines: Vec<_> = split_lines("Трубы\r\n  Профиль \n\n Лист").collect();
        assert_eq!(lines, ["Трубы", "Профиль", "Лист"]);
    }

    #[test]
    fn test_unique_values_sorted_and_deduplicated() {
        let table = "Адрес производства;Продукция;Latitude;Longitude
г. Тверь;\"Лист\nТрубы\";56,8;35,9
\"г. Москва, ул. X\";\"Трубы\nАрматура\";55,7;37,6
пос. Озерный;;56,0;36,0
г. Москва;Лист;55,7;37,6
";
        let dataset = Dataset::from_reader(table.as_bytes(), b';', &Columns::default()).unwrap();
        let p = pattern();

        let cities = unique_values(dataset.records(), "Адрес производства", ExtractMode::City(&p));
        assert_eq!(cities.into_iter().collect::<Vec<_>>(), ["Москва", "Тверь"]);

        let products = unique_values(dataset.records(), "Продукция", ExtractMode::Lines);
        assert_eq!(
            products.into_iter().collect::<Vec<_>>(),
            ["Арматура", "Лист", "Трубы"]
        );

        let missing = unique_values(dataset.records(), "Сайт", ExtractMode::Lines);
        assert!(missing.is_empty());
    }
}

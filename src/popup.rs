//! Marker popup content.
//!
//! Formatting is driven by a table from column name to [`FieldFormat`]
//! rather than by matching on column names at the call site.

use crate::config::Settings;
use crate::dataset::Record;
use crate::filter::split_lines;

/// How a field's value is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Not shown as a row
    Hidden,
    /// One line per contact; e-mails and phone numbers become links
    Contacts,
    /// Bulleted list when it has two or more entries
    ProductList,
    /// Link, unless the value says there is no site
    Website,
    /// Text split on line breaks
    Plain,
}

/// A piece of popup text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Link { label: String, href: String },
}

/// Rendered value of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupValue {
    Lines(Vec<Fragment>),
    List { items: Vec<String>, multicolumn: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    pub field: String,
    pub value: PopupValue,
}

/// Everything shown for one selected marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: Option<String>,
    pub rows: Vec<PopupRow>,
}

/// Column name to format lookup
#[derive(Debug, Clone)]
pub struct FormatTable {
    entries: Vec<(String, FieldFormat)>,
    name_field: String,
    multicolumn_threshold: usize,
}

impl FormatTable {
    pub fn from_settings(settings: &Settings) -> Self {
        let c = &settings.columns;
        Self {
            entries: vec![
                (c.row_number.clone(), FieldFormat::Hidden),
                (c.latitude.clone(), FieldFormat::Hidden),
                (c.longitude.clone(), FieldFormat::Hidden),
                (c.name.clone(), FieldFormat::Hidden),
                (c.contacts.clone(), FieldFormat::Contacts),
                (c.products.clone(), FieldFormat::ProductList),
                (c.website.clone(), FieldFormat::Website),
            ],
            name_field: c.name.clone(),
            multicolumn_threshold: settings.multicolumn_threshold,
        }
    }

    /// Format for a column; anything not listed is plain text
    pub fn format_for(&self, field: &str) -> FieldFormat {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map_or(FieldFormat::Plain, |&(_, format)| format)
    }

    /// Build the popup for a record: title from the display name, then one row per non-empty field
    pub fn popup(&self, record: &Record) -> Popup {
        let title = record.non_empty(&self.name_field).map(str::to_string);
        let rows = record
            .fields()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(field, value)| {
                let value = match self.format_for(field) {
                    FieldFormat::Hidden => return None,
                    FieldFormat::Contacts => PopupValue::Lines(format_contacts(value)),
                    FieldFormat::ProductList => format_products(value, self.multicolumn_threshold),
                    FieldFormat::Website => PopupValue::Lines(vec![format_website(value)]),
                    FieldFormat::Plain => PopupValue::Lines(plain_lines(value)),
                };
                Some(PopupRow {
                    field: field.to_string(),
                    value,
                })
            })
            .collect();
        Popup { title, rows }
    }
}

fn plain_lines(text: &str) -> Vec<Fragment> {
    text.lines().map(|line| Fragment::Text(line.to_string())).collect()
}

/// E-mail lines become `mailto:` links, lines with at least 7 digits become `tel:` links
pub fn format_contacts(text: &str) -> Vec<Fragment> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.contains('@') {
                return Fragment::Link {
                    label: line.to_string(),
                    href: format!("mailto:{line}"),
                };
            }
            let digits: String = line.chars().filter(char::is_ascii_digit).collect();
            if digits.len() >= 7 {
                Fragment::Link {
                    label: line.to_string(),
                    href: format!("tel:{digits}"),
                }
            } else {
                Fragment::Text(line.to_string())
            }
        })
        .collect()
}

/// Two or more products become a list, split into columns past `threshold`
pub fn format_products(text: &str, threshold: usize) -> PopupValue {
    let items: Vec<String> = split_lines(text).map(str::to_string).collect();
    if items.len() < 2 {
        return PopupValue::Lines(plain_lines(text.trim()));
    }
    let multicolumn = items.len() > threshold;
    PopupValue::List { items, multicolumn }
}

/// `нет` means no site; anything else is linked, defaulting to https
pub fn format_website(text: &str) -> Fragment {
    let url = text.trim();
    if url.to_lowercase() == "нет" {
        return Fragment::Text("Нет".into());
    }
    let href = if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    Fragment::Link {
        label: url.to_string(),
        href,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.into())
    }

    fn link(label: &str, href: &str) -> Fragment {
        Fragment::Link {
            label: label.into(),
            href: href.into(),
        }
    }

    #[test]
    fn test_contacts() {
        let fragments = format_contacts("Иван Петров\n ivan@zavod.ru \n+7 (495) 123-45-67\nдоб. 12");
        assert_eq!(
            fragments,
            vec![
                text("Иван Петров"),
                link("ivan@zavod.ru", "mailto:ivan@zavod.ru"),
                link("+7 (495) 123-45-67", "tel:74951234567"),
                text("доб. 12"),
            ]
        );
    }

    #[test]
    fn test_products() {
        assert_eq!(format_products("Трубы", 8), PopupValue::Lines(vec![text("Трубы")]));
        assert_eq!(
            format_products("Трубы\n\n Профиль ", 8),
            PopupValue::List {
                items: vec!["Трубы".into(), "Профиль".into()],
                multicolumn: false,
            }
        );

        let many = (1..=9).map(|i| format!("Изделие {i}")).collect::<Vec<_>>().join("\n");
        match format_products(&many, 8) {
            PopupValue::List { items, multicolumn } => {
                assert_eq!(items.len(), 9);
                assert!(multicolumn);
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn test_website() {
        assert_eq!(format_website("НЕТ"), text("Нет"));
        assert_eq!(format_website("zavod.ru"), link("zavod.ru", "https://zavod.ru"));
        assert_eq!(
            format_website("http://zavod.ru"),
            link("http://zavod.ru", "http://zavod.ru")
        );
    }

    #[test]
    fn test_format_table_defaults() {
        let table = FormatTable::from_settings(&Settings::default());
        assert_eq!(table.format_for("Latitude"), FieldFormat::Hidden);
        assert_eq!(table.format_for("№"), FieldFormat::Hidden);
        assert_eq!(table.format_for("Контактное лицо"), FieldFormat::Contacts);
        assert_eq!(table.format_for("Продукция"), FieldFormat::ProductList);
        assert_eq!(table.format_for("Сайт"), FieldFormat::Website);
        assert_eq!(table.format_for("ИНН"), FieldFormat::Plain);
    }

    #[test]
    fn test_popup_rows() {
        let table_text = "№;Наименование поставщика;Адрес производства;ИНН;Продукция;Сайт;Latitude;Longitude
1;Завод А;\"г. Москва,\nул. X\";;\"Трубы\nПрофиль\";нет;55,7;37,6
";
        let dataset =
            Dataset::from_reader(table_text.as_bytes(), b';', &Settings::default().columns).unwrap();
        let popup = FormatTable::from_settings(&Settings::default()).popup(&dataset.records()[0]);

        assert_eq!(popup.title.as_deref(), Some("Завод А"));
        let fields: Vec<_> = popup.rows.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, ["Адрес производства", "Продукция", "Сайт"]);
        assert_eq!(
            popup.rows[0].value,
            PopupValue::Lines(vec![text("г. Москва,"), text("ул. X")])
        );
        assert_eq!(popup.rows[2].value, PopupValue::Lines(vec![text("Нет")]));
    }

    #[test]
    fn test_popup_without_name_has_no_title() {
        let table_text = "Адрес производства;Latitude;Longitude\nг. Казань;55,8;49,1\n";
        let dataset =
            Dataset::from_reader(table_text.as_bytes(), b';', &Settings::default().columns).unwrap();
        let popup = FormatTable::from_settings(&Settings::default()).popup(&dataset.records()[0]);
        assert_eq!(popup.title, None);
        assert_eq!(popup.rows.len(), 1);
    }
}

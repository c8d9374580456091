/// Outcome of a user choice in a dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Changed,
    Unchanged,
}

/// A single-choice dropdown with a fixed leading "show all" placeholder.
///
/// Entry 0 is always the placeholder; entry `i + 1` is `options[i]`.
#[derive(Debug, Clone)]
pub struct Dropdown {
    placeholder: String,
    options: Vec<String>,
    /// Index into `options`; `None` while the placeholder is selected
    selected: Option<usize>,
    open: bool,
    /// Highlighted entry while open
    cursor: usize,
}

impl Dropdown {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            options: Vec::new(),
            selected: None,
            open: false,
            cursor: 0,
        }
    }

    /// Replace the options, keeping `previous` selected only if it is still offered.
    ///
    /// This is programmatic and never reports a change.
    pub fn repopulate<I>(&mut self, options: I, previous: Option<&str>)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self.selected = previous.and_then(|prev| self.options.iter().position(|o| o == prev));
        self.cursor = self.selected_entry();
    }

    /// Selected value, `None` for the placeholder
    pub fn value(&self) -> Option<&str> {
        self.selected.map(|idx| self.options[idx].as_str())
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Placeholder followed by every option
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.placeholder.as_str()).chain(self.options.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.options.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Label currently shown in the closed dropdown
    pub fn label(&self) -> &str {
        self.value().unwrap_or(&self.placeholder)
    }

    fn selected_entry(&self) -> usize {
        self.selected.map_or(0, |idx| idx + 1)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn open(&mut self) {
        self.open = true;
        self.cursor = self.selected_entry();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.cursor = self.selected_entry();
    }

    /// Move the highlight by `delta` entries, clamped to the list
    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    pub fn cursor_first(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_last(&mut self) {
        self.cursor = self.len() - 1;
    }

    /// Commit the highlighted entry and close
    pub fn choose(&mut self) -> Choice {
        let entry = self.cursor;
        self.open = false;
        self.select_entry(entry)
    }

    /// Select by value; `None` or an unknown value selects the placeholder
    pub fn choose_value(&mut self, value: Option<&str>) -> Choice {
        let entry = value
            .and_then(|v| self.options.iter().position(|o| o == v))
            .map_or(0, |idx| idx + 1);
        self.select_entry(entry)
    }

    fn select_entry(&mut self, entry: usize) -> Choice {
        let before = self.selected;
        self.selected = entry.checked_sub(1).filter(|&idx| idx < self.options.len());
        self.cursor = self.selected_entry();
        if before == self.selected {
            Choice::Unchanged
        } else {
            Choice::Changed
        }
    }
}

//! List view-model — search, filter chips and paging shared by every list page.
//!
//! Chips are ANDed: a record must match every chip, plus the settled search
//! text if any. The default predicate is a case-insensitive substring match
//! against every string in the record's serialized form, nested arrays and
//! objects included.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::listing::debounce::Debounced;

pub type Predicate<T> = Arc<dyn Fn(&T, &str) -> bool + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct PageWindow<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

pub struct ListViewModel<T> {
    records: Vec<T>,
    search: Debounced<String>,
    chips: Vec<String>,
    page_size: usize,
    current_page: usize,
    predicate: Predicate<T>,
}

impl<T: Serialize + Clone> ListViewModel<T> {
    pub fn new(records: Vec<T>, page_size: usize, debounce: Duration) -> Self {
        Self {
            records,
            search: Debounced::new(debounce),
            chips: Vec::new(),
            page_size: page_size.max(1),
            current_page: 1,
            predicate: Arc::new(|record: &T, term: &str| record_matches(record, term)),
        }
    }

    pub fn with_predicate(mut self, predicate: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn set_records(&mut self, records: Vec<T>) {
        self.records = records;
    }

    pub fn search_text(&self) -> &str {
        self.search.raw()
    }

    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.search.set(text.into(), now);
        self.current_page = 1;
    }

    /// Turns the current search text into a chip ("Enter" on the search box).
    /// Returns whether a chip was added.
    pub fn commit_search(&mut self) -> bool {
        let term = self.search.raw().trim().to_string();
        let added = self.add_chip(&term);
        if added {
            self.search.set(String::new(), Instant::now());
            self.search.flush();
        }
        added
    }

    /// Adds a chip unless it is blank or already present. Compared the same
    /// way records are matched, so case never makes two chips distinct.
    pub fn add_chip(&mut self, term: &str) -> bool {
        let term = term.trim();
        let folded = term.to_lowercase();
        if term.is_empty() || self.chips.iter().any(|c| c.to_lowercase() == folded) {
            return false;
        }
        self.chips.push(term.to_string());
        self.current_page = 1;
        true
    }

    pub fn remove_chip(&mut self, index: usize) -> Option<String> {
        if index >= self.chips.len() {
            return None;
        }
        self.current_page = 1;
        Some(self.chips.remove(index))
    }

    pub fn clear_chips(&mut self) {
        self.chips.clear();
        self.current_page = 1;
    }

    pub fn chips(&self) -> &[String] {
        &self.chips
    }

    /// Requested page, 1-based. Clamped when the window is built.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn filtered(&self, now: Instant) -> Vec<&T> {
        let search = self.search.get(now).trim();
        self.records
            .iter()
            .filter(|record| {
                self.chips.iter().all(|chip| (self.predicate)(*record, chip.as_str()))
                    && (search.is_empty() || (self.predicate)(*record, search))
            })
            .collect()
    }

    pub fn page(&self, now: Instant) -> PageWindow<T> {
        let filtered = self.filtered(now);
        let total_items = filtered.len();
        let total_pages = total_items.div_ceil(self.page_size).max(1);
        let page = self.current_page.min(total_pages);

        let items = filtered
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect();

        PageWindow {
            items,
            page,
            page_size: self.page_size,
            total_items,
            total_pages,
        }
    }
}

/// True if any string in `record`'s serialized form contains `term`, ignoring case.
pub fn record_matches<T: Serialize>(record: &T, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    match serde_json::to_value(record) {
        Ok(value) => value_contains(&value, &term),
        Err(_) => false,
    }
}

fn value_contains(value: &Value, term: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(term),
        Value::Array(items) => items.iter().any(|v| value_contains(v, term)),
        Value::Object(map) => map.values().any(|v| value_contains(v, term)),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

//! In-memory panel cache keyed by reference date.
//!
//! Holds at most `capacity` panels and evicts the least recently used
//! reference date. Panels are shared through `Arc`, so a cached panel can be
//! handed to a pipeline run without copying. Not synchronized: a single
//! owner drives it.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use rslab_core::Panel;

#[derive(Debug, Clone)]
pub struct PanelCache {
    capacity: usize,
    /// Least recently used first.
    entries: VecDeque<(NaiveDate, Arc<Panel>)>,
    current: Option<NaiveDate>,
}

impl PanelCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            current: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, reference_date: NaiveDate) -> bool {
        self.entries.iter().any(|(d, _)| *d == reference_date)
    }

    /// Fetch a panel and mark it most recently used.
    pub fn get(&mut self, reference_date: NaiveDate) -> Option<Arc<Panel>> {
        let pos = self.entries.iter().position(|(d, _)| *d == reference_date)?;
        let entry = self.entries.remove(pos)?;
        let panel = Arc::clone(&entry.1);
        self.entries.push_back(entry);
        debug!(%reference_date, "panel cache hit");
        Some(panel)
    }

    /// Store (or replace) the panel for `reference_date` and make it the
    /// current reference date. Returns the evicted reference date, if any.
    pub fn insert(&mut self, reference_date: NaiveDate, panel: Panel) -> Option<NaiveDate> {
        self.insert_shared(reference_date, Arc::new(panel))
    }

    pub fn insert_shared(
        &mut self,
        reference_date: NaiveDate,
        panel: Arc<Panel>,
    ) -> Option<NaiveDate> {
        self.entries.retain(|(d, _)| *d != reference_date);
        self.entries.push_back((reference_date, panel));
        self.current = Some(reference_date);

        if self.entries.len() > self.capacity {
            let (evicted, _) = self.entries.pop_front()?;
            warn!(%evicted, capacity = self.capacity, "panel cache evicted reference date");
            return Some(evicted);
        }
        None
    }

    /// The reference date most recently inserted, if any.
    pub fn current_reference_date(&self) -> Option<NaiveDate> {
        self.current
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }
}

impl Default for PanelCache {
    fn default() -> Self {
        Self::new(8)
    }
}

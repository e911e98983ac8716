//! Filters over a member's stamp history.

use stamplink_core::{StampEvent, StampEventType};

/// Trait for selecting history entries.
pub trait HistoryFilter {
    /// Returns true if the event matches the filter criteria.
    fn matches(&self, event: &StampEvent) -> bool;
}

/// Filter by event type.
#[derive(Debug, Clone)]
pub struct EventTypeFilter {
    /// Event type to match.
    pub kind: StampEventType,
}

impl HistoryFilter for EventTypeFilter {
    fn matches(&self, event: &StampEvent) -> bool {
        event.kind == self.kind
    }
}

/// Filter by time range, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default)]
pub struct TimeRangeFilter {
    /// Include events at or after this time.
    pub after: Option<i64>,
    /// Include events at or before this time.
    pub before: Option<i64>,
}

impl HistoryFilter for TimeRangeFilter {
    fn matches(&self, event: &StampEvent) -> bool {
        if let Some(after) = self.after {
            if event.timestamp < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if event.timestamp > before {
                return false;
            }
        }
        true
    }
}

/// Keeps only entries confirmed by the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmedFilter;

impl HistoryFilter for ConfirmedFilter {
    fn matches(&self, event: &StampEvent) -> bool {
        !event.is_synthetic()
    }
}

/// Composite filter: all filters must match (AND).
#[derive(Default)]
pub struct AndFilter {
    /// Filters to combine with AND logic.
    pub filters: Vec<Box<dyn HistoryFilter + Send + Sync>>,
}

impl AndFilter {
    /// Adds a filter.
    pub fn with(mut self, filter: impl HistoryFilter + Send + Sync + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl HistoryFilter for AndFilter {
    fn matches(&self, event: &StampEvent) -> bool {
        self.filters.iter().all(|f| f.matches(event))
    }
}

/// Returns the matching entries, preserving history order.
pub fn filter_history<'a, F: HistoryFilter + ?Sized>(
    history: &'a [StampEvent],
    filter: &F,
) -> Vec<&'a StampEvent> {
    history.iter().filter(|e| filter.matches(e)).collect()
}

//! Filter engine: (date range, segment set) → mutually consistent views.
//!
//! Views borrow rows from the snapshot and keep base-table order.
//! Segment selection only ever narrows the customer view; the
//! transaction view depends on the date range alone.

use crate::{
    error::{DashError, DashResult},
    snapshot::{CustomerFeatures, DatasetSnapshot, Transaction},
    types::{SegmentId, DEFAULT_SEGMENTS},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Inclusive range of calendar days. Time of day is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DashResult<Self> {
        if start > end {
            return Err(DashError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    /// None means no date restriction.
    pub date_range: Option<DateRange>,
    pub segments: BTreeSet<SegmentId>,
}

impl Default for FilterParams {
    /// No date restriction, every default segment selected.
    fn default() -> Self {
        Self {
            date_range: None,
            segments: DEFAULT_SEGMENTS.into_iter().collect(),
        }
    }
}

impl FilterParams {
    pub fn new(date_range: Option<DateRange>, segments: impl IntoIterator<Item = SegmentId>) -> Self {
        Self {
            date_range,
            segments: segments.into_iter().collect(),
        }
    }
}

/// The filtered tables handed to every downstream engine.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredView<'a> {
    #[serde(skip)]
    base: &'a DatasetSnapshot,
    pub transactions: Vec<&'a Transaction>,
    pub customers: Vec<&'a CustomerFeatures>,
}

impl<'a> FilteredView<'a> {
    /// The snapshot this view was derived from (the KPI baseline).
    pub fn base(&self) -> &'a DatasetSnapshot {
        self.base
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.customers.is_empty()
    }
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.base, other.base)
            && self.transactions == other.transactions
            && self.customers == other.customers
    }
}

pub fn apply_filters<'a>(snapshot: &'a DatasetSnapshot, params: &FilterParams) -> FilteredView<'a> {
    let transactions: Vec<&Transaction> = match params.date_range {
        Some(range) => snapshot
            .transactions()
            .iter()
            .filter(|t| range.contains(t.order_date.date()))
            .collect(),
        None => snapshot.transactions().iter().collect(),
    };

    let in_segment = |c: &&CustomerFeatures| params.segments.contains(&c.cluster);
    let customers: Vec<&CustomerFeatures> = if params.date_range.is_some() {
        let active: HashSet<&str> = transactions.iter().map(|t| t.customer_id.as_str()).collect();
        snapshot
            .customers()
            .iter()
            .filter(in_segment)
            .filter(|c| active.contains(c.customer_id.as_str()))
            .collect()
    } else {
        snapshot.customers().iter().filter(in_segment).collect()
    };

    FilteredView { base: snapshot, transactions, customers }
}

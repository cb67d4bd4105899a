//! Time-series aggregator: (calendar month, segment) buckets.
//!
//! Transactions are left-joined to the full customer table. A transaction
//! whose customer is missing from that table keeps its revenue and lands
//! in the `Unknown` segment, which sorts after every known segment.
//! Months with no transactions produce no bucket.

use crate::{filter::FilteredView, snapshot::DatasetSnapshot, types::SegmentId};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Join result: a known segment, or `Unknown` (serialized as null).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentKey {
    Known(SegmentId),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(instant: NaiveDateTime) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// First day of the month at midnight: the bucket's representative instant.
    pub fn start(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub year_month: YearMonth,
    pub month_start: NaiveDateTime,
    pub segment: SegmentKey,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub unique_customers: usize,
    pub order_count: usize,
}

#[derive(Default)]
struct BucketAcc<'a> {
    revenue: f64,
    orders: usize,
    customers: BTreeSet<&'a str>,
}

/// Bucket the filtered transactions by month and segment, joined against
/// every customer in `customers` (not just the filtered ones).
pub fn monthly_rollup(view: &FilteredView<'_>, customers: &DatasetSnapshot) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<(YearMonth, SegmentKey), BucketAcc<'_>> = BTreeMap::new();
    let mut unjoined = 0usize;

    for t in &view.transactions {
        let segment = match customers.segment_of(&t.customer_id) {
            Some(s) => SegmentKey::Known(s),
            None => {
                unjoined += 1;
                SegmentKey::Unknown
            }
        };
        let acc = buckets.entry((YearMonth::of(t.order_date), segment)).or_default();
        acc.revenue += t.purchase_amount;
        acc.orders += 1;
        acc.customers.insert(t.customer_id.as_str());
    }

    if unjoined > 0 {
        log::warn!(
            "rollup: {unjoined} of {} transactions have no customer row; bucketed as unknown segment",
            view.transactions.len()
        );
    }

    buckets
        .into_iter()
        .map(|((year_month, segment), acc)| MonthlyBucket {
            year_month,
            month_start: year_month.start(),
            segment,
            total_revenue: acc.revenue,
            avg_order_value: acc.revenue / acc.orders as f64,
            unique_customers: acc.customers.len(),
            order_count: acc.orders,
        })
        .collect()
}

/// Rollup joined against the snapshot the view was filtered from.
pub fn compute_monthly_rollup(view: &FilteredView<'_>) -> Vec<MonthlyBucket> {
    monthly_rollup(view, view.base())
}

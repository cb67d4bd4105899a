//! Metrics engine: headline KPIs against the whole-population baseline.
//!
//! Means over an empty view and ratios against a zero baseline are
//! reported as `Aggregate::Unavailable`, never as NaN. Counts and sums
//! of an empty view are a plain 0.

use crate::filter::FilteredView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Mean of zero rows.
    EmptyView,
    /// The baseline a ratio divides by is 0.
    ZeroBaseline,
    /// The baseline itself could not be computed.
    BaselineUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Aggregate {
    Available { value: f64 },
    Unavailable { reason: UnavailableReason },
}

impl Aggregate {
    pub fn available(value: f64) -> Self {
        Aggregate::Available { value }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Aggregate::Available { value } => Some(*value),
            Aggregate::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Aggregate::Available { .. })
    }

    pub fn mean(values: impl IntoIterator<Item = f64>) -> Self {
        let (sum, n) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            Aggregate::Unavailable { reason: UnavailableReason::EmptyView }
        } else {
            Aggregate::available(sum / n as f64)
        }
    }

    /// Apply `f` to (value, baseline), guarding against a zero or missing baseline.
    fn against(self, baseline: Aggregate, f: impl Fn(f64, f64) -> f64) -> Aggregate {
        match (self, baseline) {
            (Aggregate::Unavailable { reason }, _) => Aggregate::Unavailable { reason },
            (_, Aggregate::Unavailable { .. }) => Aggregate::Unavailable {
                reason: UnavailableReason::BaselineUnavailable,
            },
            (_, Aggregate::Available { value: b }) if b == 0.0 => Aggregate::Unavailable {
                reason: UnavailableReason::ZeroBaseline,
            },
            (Aggregate::Available { value: v }, Aggregate::Available { value: b }) => {
                Aggregate::available(f(v, b))
            }
        }
    }
}

/// `(value - baseline) / baseline * 100`.
pub fn delta_pct(value: Aggregate, baseline: Aggregate) -> Aggregate {
    value.against(baseline, |v, b| (v - b) / b * 100.0)
}

/// `value / baseline * 100`.
pub fn share_pct(value: Aggregate, baseline: Aggregate) -> Aggregate {
    value.against(baseline, |v, b| v / b * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub value: Aggregate,
    pub baseline: Aggregate,
    pub delta_pct: Aggregate,
    pub share_pct: Aggregate,
}

impl Kpi {
    pub fn compare(value: Aggregate, baseline: Aggregate) -> Self {
        Self {
            value,
            baseline,
            delta_pct: delta_pct(value, baseline),
            share_pct: share_pct(value, baseline),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub customer_count: Kpi,
    pub total_revenue: Kpi,
    pub avg_order_value: Kpi,
    pub avg_frequency: Kpi,
}

pub fn compute_kpis(view: &FilteredView<'_>) -> KpiSet {
    let base = view.base();

    // customer_id is the customer table's primary key, so rows are distinct.
    let customer_count = Kpi::compare(
        Aggregate::available(view.customers.len() as f64),
        Aggregate::available(base.customers().len() as f64),
    );

    let total_revenue = Kpi::compare(
        Aggregate::available(view.transactions.iter().map(|t| t.purchase_amount).sum()),
        Aggregate::available(base.transactions().iter().map(|t| t.purchase_amount).sum()),
    );

    let avg_order_value = Kpi::compare(
        Aggregate::mean(view.transactions.iter().map(|t| t.purchase_amount)),
        Aggregate::mean(base.transactions().iter().map(|t| t.purchase_amount)),
    );

    let avg_frequency = Kpi::compare(
        Aggregate::mean(view.customers.iter().map(|c| c.frequency)),
        Aggregate::mean(base.customers().iter().map(|c| c.frequency)),
    );

    KpiSet {
        customer_count,
        total_revenue,
        avg_order_value,
        avg_frequency,
    }
}

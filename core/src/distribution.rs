//! Per-segment value samples of one customer metric, with the box-plot
//! summary the histogram marginal needs.

use crate::{
    error::{DashError, DashResult},
    filter::FilteredView,
    snapshot::CustomerFeatures,
    types::SegmentId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The nine customer metrics a distribution can be drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Monetary,
    Frequency,
    Recency,
    PurchaseVariability,
    TenureDays,
    PurchasesPerDay,
    SpendPerDay,
    RecencyRatio,
    CustomerValueScore,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::Monetary,
        Feature::Frequency,
        Feature::Recency,
        Feature::PurchaseVariability,
        Feature::TenureDays,
        Feature::PurchasesPerDay,
        Feature::SpendPerDay,
        Feature::RecencyRatio,
        Feature::CustomerValueScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Monetary => "monetary",
            Feature::Frequency => "frequency",
            Feature::Recency => "recency",
            Feature::PurchaseVariability => "purchase_variability",
            Feature::TenureDays => "tenure_days",
            Feature::PurchasesPerDay => "purchases_per_day",
            Feature::SpendPerDay => "spend_per_day",
            Feature::RecencyRatio => "recency_ratio",
            Feature::CustomerValueScore => "customer_value_score",
        }
    }

    pub fn value_of(&self, c: &CustomerFeatures) -> f64 {
        match self {
            Feature::Monetary => c.monetary,
            Feature::Frequency => c.frequency,
            Feature::Recency => c.recency,
            Feature::PurchaseVariability => c.purchase_variability,
            Feature::TenureDays => c.tenure_days,
            Feature::PurchasesPerDay => c.purchases_per_day,
            Feature::SpendPerDay => c.spend_per_day,
            Feature::RecencyRatio => c.recency_ratio,
            Feature::CustomerValueScore => c.customer_value_score,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| DashError::UnknownFeature { name: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl SummaryStats {
    /// None for an empty sample.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        })
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSeries {
    pub segment: SegmentId,
    /// In filtered-view order.
    pub values: Vec<f64>,
    pub summary: Option<SummaryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDistribution {
    pub feature: Feature,
    pub series: Vec<FeatureSeries>,
}

pub fn compute_feature_distribution(view: &FilteredView<'_>, feature: Feature) -> FeatureDistribution {
    let mut samples: BTreeMap<SegmentId, Vec<f64>> = BTreeMap::new();
    for c in &view.customers {
        samples.entry(c.cluster).or_default().push(feature.value_of(c));
    }
    let series = samples
        .into_iter()
        .map(|(segment, values)| FeatureSeries {
            segment,
            summary: SummaryStats::of(&values),
            values,
        })
        .collect();
    FeatureDistribution { feature, series }
}

/// Resolve a metric by column name, then compute its distribution.
pub fn compute_feature_distribution_by_name(
    view: &FilteredView<'_>,
    name: &str,
) -> DashResult<FeatureDistribution> {
    let feature: Feature = name.parse()?;
    Ok(compute_feature_distribution(view, feature))
}

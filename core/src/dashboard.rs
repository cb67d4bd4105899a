//! The dashboard facade: one recomputation pass per filter change.
//!
//! PASS ORDER (fixed):
//!   1. Filter engine      (date range, segment set)
//!   2. Metrics engine     (KPIs vs. whole-population baseline)
//!   3. Segment distribution
//!   4. Segment profile    (means + normalized radar vector)
//!   5. Monthly rollup     (left join, month × segment buckets)
//!
//! RULES:
//!   - The snapshot is shared read-only; a pass never mutates it.
//!   - Every pass recomputes from the snapshot. Nothing is cached
//!     between filter changes, so a newer pass simply supersedes an older one.

use crate::{
    config::DashConfig,
    distribution::{compute_feature_distribution, Feature, FeatureDistribution},
    error::DashResult,
    filter::{apply_filters, FilterParams, FilteredView},
    metrics::{compute_kpis, KpiSet},
    profile::{compute_segment_distribution, compute_segment_profile, SegmentProfile, SegmentShare},
    rollup::{compute_monthly_rollup, MonthlyBucket},
    snapshot::DatasetSnapshot,
    store::DatasetStore,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Everything the rendering layer needs for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardFrame {
    pub filters: FilterParams,
    pub transaction_count: usize,
    pub customer_count: usize,
    pub kpis: KpiSet,
    pub segment_distribution: Vec<SegmentShare>,
    pub segment_profiles: Vec<SegmentProfile>,
    pub monthly: Vec<MonthlyBucket>,
}

pub struct Dashboard {
    snapshot: Arc<DatasetSnapshot>,
}

impl Dashboard {
    pub fn new(snapshot: Arc<DatasetSnapshot>) -> Self {
        Self { snapshot }
    }

    /// Load both base tables from `store` once and wrap them.
    pub fn load(store: &DatasetStore, config: &DashConfig) -> DashResult<Self> {
        let snapshot = store.load_snapshot(config)?;
        Ok(Self::new(Arc::new(snapshot)))
    }

    /// Default date-picker range: first to last order day.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.snapshot.date_bounds()
    }

    pub fn apply_filters(&self, params: &FilterParams) -> FilteredView<'_> {
        apply_filters(&self.snapshot, params)
    }

    pub fn compute_kpis(&self, view: &FilteredView<'_>) -> KpiSet {
        compute_kpis(view)
    }

    pub fn compute_segment_profile(&self, view: &FilteredView<'_>) -> Vec<SegmentProfile> {
        compute_segment_profile(view)
    }

    pub fn compute_segment_distribution(&self, view: &FilteredView<'_>) -> Vec<SegmentShare> {
        compute_segment_distribution(view)
    }

    pub fn compute_feature_distribution(
        &self,
        view: &FilteredView<'_>,
        feature: Feature,
    ) -> FeatureDistribution {
        compute_feature_distribution(view, feature)
    }

    pub fn compute_monthly_rollup(&self, view: &FilteredView<'_>) -> Vec<MonthlyBucket> {
        compute_monthly_rollup(view)
    }

    /// Run the full pass for one filter state.
    pub fn refresh(&self, params: &FilterParams) -> DashboardFrame {
        let view = self.apply_filters(params);
        if view.is_empty() {
            log::debug!("refresh: filter {params:?} matched no rows");
        }

        let frame = DashboardFrame {
            filters: params.clone(),
            transaction_count: view.transactions.len(),
            customer_count: view.customers.len(),
            kpis: self.compute_kpis(&view),
            segment_distribution: self.compute_segment_distribution(&view),
            segment_profiles: self.compute_segment_profile(&view),
            monthly: self.compute_monthly_rollup(&view),
        };
        log::debug!(
            "refresh: {} transactions, {} customers, {} monthly buckets",
            frame.transaction_count,
            frame.customer_count,
            frame.monthly.len()
        );
        frame
    }
}

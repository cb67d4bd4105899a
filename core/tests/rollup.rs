//! Monthly rollup: month × segment buckets over the filtered transactions.

mod common;

use common::{assert_close, fixture, params};
use segdash_core::{
    filter::apply_filters,
    rollup::{compute_monthly_rollup, MonthlyBucket, SegmentKey},
    synth::{generate, SynthParams},
};

fn keys(buckets: &[MonthlyBucket]) -> Vec<(String, SegmentKey)> {
    buckets
        .iter()
        .map(|b| (b.year_month.to_string(), b.segment))
        .collect()
}

fn revenue(buckets: &[MonthlyBucket]) -> f64 {
    buckets.iter().map(|b| b.total_revenue).sum()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn fixture_buckets_in_month_then_segment_order() {
    common::init_logging();
    let snap = fixture();
    let buckets = compute_monthly_rollup(&apply_filters(&snap, &params(None, &[0, 1])));

    assert_eq!(
        keys(&buckets),
        vec![
            ("2023-12".to_string(), SegmentKey::Known(1)),
            ("2024-01".to_string(), SegmentKey::Known(0)),
            ("2024-01".to_string(), SegmentKey::Known(1)),
            ("2024-03".to_string(), SegmentKey::Known(0)),
            ("2024-03".to_string(), SegmentKey::Known(1)),
            ("2024-03".to_string(), SegmentKey::Unknown),
        ],
        "February has no orders and must produce no bucket"
    );

    let jan_occasional = &buckets[1];
    assert_close(jan_occasional.total_revenue, 200.0);
    assert_eq!(jan_occasional.order_count, 3);
    assert_eq!(jan_occasional.unique_customers, 2);
    assert_close(jan_occasional.avg_order_value, 200.0 / 3.0);
    assert_eq!(jan_occasional.month_start, common::at("2024-01-01 00:00"));

    let unknown = &buckets[5];
    assert_close(unknown.total_revenue, 100.0);
    assert_eq!(unknown.unique_customers, 1);
}

/// Unjoinable transactions keep their revenue, so the buckets always add
/// up to the filtered transaction total.
#[test]
fn rollup_conserves_revenue() {
    let snap = fixture();
    for range in [
        None,
        Some(("2024-01-01", "2024-01-31")),
        Some(("2024-03-01", "2024-03-31")),
        Some(("2024-02-01", "2024-02-29")),
    ] {
        let view = apply_filters(&snap, &params(range, &[0, 1]));
        let expected: f64 = view.transactions.iter().map(|t| t.purchase_amount).sum();
        assert_close(revenue(&compute_monthly_rollup(&view)), expected);
    }
    assert_close(revenue(&compute_monthly_rollup(&apply_filters(&snap, &params(None, &[0, 1])))), 1100.0);
}

#[test]
fn date_range_limits_the_months() {
    let snap = fixture();
    let buckets =
        compute_monthly_rollup(&apply_filters(&snap, &params(Some(("2024-01-01", "2024-01-31")), &[0, 1])));
    assert_eq!(
        keys(&buckets),
        vec![
            ("2024-01".to_string(), SegmentKey::Known(0)),
            ("2024-01".to_string(), SegmentKey::Known(1)),
        ]
    );
}

/// The join is against every customer, so deselecting a segment does not
/// move its transactions anywhere.
#[test]
fn segment_selection_does_not_change_the_rollup() {
    let snap = fixture();
    let all = compute_monthly_rollup(&apply_filters(&snap, &params(None, &[0, 1])));
    let only_loyal = compute_monthly_rollup(&apply_filters(&snap, &params(None, &[1])));
    let none = compute_monthly_rollup(&apply_filters(&snap, &params(None, &[])));
    assert_eq!(all, only_loyal);
    assert_eq!(all, none);
}

#[test]
fn empty_view_has_no_buckets() {
    let snap = fixture();
    let buckets =
        compute_monthly_rollup(&apply_filters(&snap, &params(Some(("2024-02-01", "2024-02-29")), &[0, 1])));
    assert!(buckets.is_empty());
}

#[test]
fn orphaned_customers_land_in_the_unknown_segment() {
    let snap = generate(&SynthParams { orphan_rate: 0.2, ..SynthParams::default() }).expect("synth");
    let view = apply_filters(&snap, &params(None, &[0, 1]));
    let buckets = compute_monthly_rollup(&view);

    assert!(
        buckets.iter().any(|b| b.segment == SegmentKey::Unknown),
        "a 20% orphan rate must leave some transactions unjoined"
    );
    let expected: f64 = view.transactions.iter().map(|t| t.purchase_amount).sum();
    assert!((revenue(&buckets) - expected).abs() < 1e-6);

    let orders: usize = buckets.iter().map(|b| b.order_count).sum();
    assert_eq!(orders, view.transactions.len());
}

#[test]
fn bucket_serializes_month_and_unknown_segment() {
    let snap = fixture();
    let buckets = compute_monthly_rollup(&apply_filters(&snap, &params(None, &[0, 1])));
    let json = serde_json::to_value(&buckets[5]).unwrap();
    assert_eq!(json["year_month"], "2024-03");
    assert!(json["segment"].is_null());

    let json = serde_json::to_value(&buckets[0]).unwrap();
    assert_eq!(json["segment"], 1);
}

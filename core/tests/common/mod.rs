//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use segdash_core::{
    filter::{DateRange, FilterParams},
    snapshot::{CustomerFeatures, DatasetSnapshot, Transaction},
    types::SegmentId,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("valid timestamp")
}

pub fn txn(customer_id: &str, when: &str, amount: f64) -> Transaction {
    Transaction {
        customer_id: customer_id.into(),
        order_date: at(when),
        purchase_amount: amount,
        currency: "USD".into(),
    }
}

/// Customer with the four profiled metrics set; the rest derive from them.
pub fn customer(
    customer_id: &str,
    cluster: SegmentId,
    monetary: f64,
    frequency: f64,
    recency: f64,
    value_score: f64,
) -> CustomerFeatures {
    CustomerFeatures {
        customer_id: customer_id.into(),
        cluster,
        monetary,
        frequency,
        recency,
        purchase_variability: monetary / 10.0,
        tenure_days: 90.0,
        purchases_per_day: frequency / 90.0,
        spend_per_day: monetary / 90.0,
        recency_ratio: recency / (90.0 + recency),
        customer_value_score: value_score,
        first_purchase: None,
        last_purchase: None,
    }
}

/// Four customers (a, b in segment 0; c, d in segment 1) and eight
/// transactions, one of them from "x", who has no customer row.
/// Total revenue is 1100.
pub fn fixture() -> DatasetSnapshot {
    let customers = vec![
        customer("a", 0, 100.0, 2.0, 30.0, 1.0),
        customer("b", 0, 300.0, 4.0, 10.0, 3.0),
        customer("c", 1, 1000.0, 10.0, 5.0, 8.0),
        customer("d", 1, 600.0, 6.0, 15.0, 6.0),
    ];
    let transactions = vec![
        txn("d", "2023-12-30 16:00", 100.0),
        txn("a", "2024-01-05 09:30", 50.0),
        txn("b", "2024-01-10 12:00", 100.0),
        txn("c", "2024-01-15 18:45", 200.0),
        txn("a", "2024-01-20 08:15", 50.0),
        txn("c", "2024-03-02 10:00", 300.0),
        txn("x", "2024-03-10 11:11", 100.0),
        txn("b", "2024-03-31 23:59", 200.0),
    ];
    DatasetSnapshot::new(transactions, customers).expect("fixture snapshot")
}

pub fn params(range: Option<(&str, &str)>, segments: &[SegmentId]) -> FilterParams {
    let range = range.map(|(s, e)| DateRange::new(day(s), day(e)).expect("valid range"));
    FilterParams::new(range, segments.iter().copied())
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

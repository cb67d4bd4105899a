//! Synthetic dataset generator for demos and tests.
//!
//! Each customer is drawn as a loyalist (segment 1) or an occasional buyer
//! (segment 0); loyalists order more often and spend more per order. The
//! feature columns are then derived from the generated orders, relative
//! to a reference day one day after the last order in the whole log.

use crate::{
    error::DashResult,
    rng::{SeededRng, Stream},
    snapshot::{CustomerFeatures, DatasetSnapshot, Transaction},
    types::SegmentId,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const LOYALIST: SegmentId = 1;
const OCCASIONAL: SegmentId = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthParams {
    pub seed: u64,
    pub customers: usize,
    pub start: NaiveDate,
    /// Length of the order window in days.
    pub days: u32,
    pub loyalist_share: f64,
    /// Probability that a customer's feature row is withheld, leaving
    /// their transactions unjoinable.
    pub orphan_rate: f64,
    pub currency: String,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            seed: 42,
            customers: 500,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            days: 365,
            loyalist_share: 0.16,
            orphan_rate: 0.0,
            currency: "USD".into(),
        }
    }
}

struct Behaviour {
    min_orders: u64,
    extra_orders: u64,
    amount_xmin: f64,
    amount_alpha: f64,
}

const LOYALIST_BEHAVIOUR: Behaviour = Behaviour {
    min_orders: 8,
    extra_orders: 18,
    amount_xmin: 40.0,
    amount_alpha: 2.2,
};

const OCCASIONAL_BEHAVIOUR: Behaviour = Behaviour {
    min_orders: 1,
    extra_orders: 4,
    amount_xmin: 15.0,
    amount_alpha: 1.8,
};

pub fn generate(params: &SynthParams) -> DashResult<DatasetSnapshot> {
    let mut who = SeededRng::new(params.seed, Stream::Customers);
    let mut orders_rng = SeededRng::new(params.seed, Stream::Orders);
    let window_secs = u64::from(params.days.max(1)) * 86_400;
    let origin = params.start.and_hms_opt(0, 0, 0).unwrap_or_default();

    // (customer_id, segment, keep feature row, orders sorted by time)
    let mut drafts: Vec<(String, SegmentId, bool, Vec<Transaction>)> =
        Vec::with_capacity(params.customers);

    for i in 0..params.customers {
        let segment = if who.chance(params.loyalist_share) { LOYALIST } else { OCCASIONAL };
        let keep_row = !who.chance(params.orphan_rate);
        let behaviour = if segment == LOYALIST { &LOYALIST_BEHAVIOUR } else { &OCCASIONAL_BEHAVIOUR };
        let customer_id = format!("c-{i:06}");

        let n = behaviour.min_orders + orders_rng.next_u64_below(behaviour.extra_orders + 1);
        let mut orders: Vec<Transaction> = (0..n)
            .map(|_| {
                let offset = orders_rng.next_u64_below(window_secs) as i64;
                let raw = orders_rng.pareto(behaviour.amount_xmin, behaviour.amount_alpha);
                let capped = raw.min(behaviour.amount_xmin * 20.0);
                Transaction {
                    customer_id: customer_id.clone(),
                    order_date: origin + Duration::seconds(offset),
                    purchase_amount: (capped * 100.0).round() / 100.0,
                    currency: params.currency.clone(),
                }
            })
            .collect();
        orders.sort_by_key(|t| t.order_date);
        drafts.push((customer_id, segment, keep_row, orders));
    }

    let reference = drafts
        .iter()
        .filter_map(|(_, _, _, orders)| orders.last().map(|t| t.order_date.date()))
        .max()
        .map(|d| d + Duration::days(1))
        .unwrap_or(params.start);

    let mut customers = Vec::new();
    let mut transactions = Vec::new();
    for (customer_id, segment, keep_row, orders) in drafts {
        if keep_row {
            if let Some(features) = derive_features(&customer_id, segment, &orders, reference) {
                customers.push(features);
            }
        }
        transactions.extend(orders);
    }
    transactions.sort_by_key(|t| t.order_date);

    log::info!(
        "synth: seed={} generated {} customers ({} with feature rows) and {} transactions",
        params.seed,
        params.customers,
        customers.len(),
        transactions.len()
    );
    DatasetSnapshot::new(transactions, customers)
}

fn days_between(a: NaiveDateTime, b: NaiveDate) -> f64 {
    (b - a.date()).num_days() as f64
}

/// None when the customer has no orders.
fn derive_features(
    customer_id: &str,
    cluster: SegmentId,
    orders: &[Transaction],
    reference: NaiveDate,
) -> Option<CustomerFeatures> {
    let first = orders.first()?.order_date;
    let last = orders.last()?.order_date;

    let amounts: Vec<f64> = orders.iter().map(|t| t.purchase_amount).collect();
    let frequency = amounts.len() as f64;
    let monetary: f64 = amounts.iter().sum();
    let mean = monetary / frequency;
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / frequency;

    let recency = days_between(last, reference);
    let tenure_days = days_between(first, last.date());
    let active_days = tenure_days.max(1.0);
    let recency_ratio = if tenure_days + recency > 0.0 {
        recency / (tenure_days + recency)
    } else {
        0.0
    };

    Some(CustomerFeatures {
        customer_id: customer_id.to_string(),
        cluster,
        monetary,
        frequency,
        recency,
        purchase_variability: variance.sqrt(),
        tenure_days,
        purchases_per_day: frequency / active_days,
        spend_per_day: monetary / active_days,
        recency_ratio,
        customer_value_score: (1.0 + monetary).ln() * frequency / (1.0 + recency / 30.0),
        first_purchase: Some(first),
        last_purchase: Some(last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_features_follow_orders() {
        let at = |d: &str| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        };
        let orders = vec![
            Transaction {
                customer_id: "c".into(),
                order_date: at("2024-01-01"),
                purchase_amount: 10.0,
                currency: "USD".into(),
            },
            Transaction {
                customer_id: "c".into(),
                order_date: at("2024-01-11"),
                purchase_amount: 30.0,
                currency: "USD".into(),
            },
        ];
        let reference = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        let f = derive_features("c", 1, &orders, reference).unwrap();

        assert_eq!(f.monetary, 40.0);
        assert_eq!(f.frequency, 2.0);
        assert_eq!(f.recency, 10.0);
        assert_eq!(f.tenure_days, 10.0);
        assert_eq!(f.purchase_variability, 10.0);
        assert_eq!(f.purchases_per_day, 0.2);
        assert_eq!(f.spend_per_day, 4.0);
        assert_eq!(f.recency_ratio, 0.5);
        assert!(derive_features("c", 1, &[], reference).is_none());
    }
}

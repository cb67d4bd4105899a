//! The dataset snapshot: both base tables, typed and immutable.
//!
//! A snapshot is built once at startup (from the store or the synthetic
//! generator) and shared read-only by every query. Nothing mutates it
//! after construction; filtered tables are borrowed views over it.

use crate::{
    error::{DashError, DashResult},
    types::{CustomerId, SegmentId},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub order_date: NaiveDateTime,
    pub purchase_amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerFeatures {
    pub customer_id: CustomerId,
    pub cluster: SegmentId,
    pub monetary: f64,
    pub frequency: f64,
    /// Days since the last purchase.
    pub recency: f64,
    pub purchase_variability: f64,
    pub tenure_days: f64,
    pub purchases_per_day: f64,
    pub spend_per_day: f64,
    pub recency_ratio: f64,
    pub customer_value_score: f64,
    pub first_purchase: Option<NaiveDateTime>,
    pub last_purchase: Option<NaiveDateTime>,
}

#[derive(Debug)]
pub struct DatasetSnapshot {
    transactions: Vec<Transaction>,
    customers: Vec<CustomerFeatures>,
    /// customer_id -> position in `customers`.
    index: HashMap<CustomerId, usize>,
}

impl DatasetSnapshot {
    /// Fails on a repeated customer_id: it is the table's primary key.
    pub fn new(
        transactions: Vec<Transaction>,
        customers: Vec<CustomerFeatures>,
    ) -> DashResult<Self> {
        let mut index = HashMap::with_capacity(customers.len());
        for (pos, c) in customers.iter().enumerate() {
            if index.insert(c.customer_id.clone(), pos).is_some() {
                return Err(DashError::DuplicateCustomer {
                    customer_id: c.customer_id.clone(),
                });
            }
        }
        Ok(Self { transactions, customers, index })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn customers(&self) -> &[CustomerFeatures] {
        &self.customers
    }

    pub fn customer(&self, customer_id: &str) -> Option<&CustomerFeatures> {
        self.index.get(customer_id).map(|&pos| &self.customers[pos])
    }

    /// Segment of a customer, or None when the id is not in the customer table.
    pub fn segment_of(&self, customer_id: &str) -> Option<SegmentId> {
        self.customer(customer_id).map(|c| c.cluster)
    }

    /// Earliest and latest order day. None for an empty transaction table.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut days = self.transactions.iter().map(|t| t.order_date.date());
        let first = days.next()?;
        Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Everything downstream works on the typed DatasetSnapshot it produces.

use crate::{
    config::DashConfig,
    error::{DashError, DashResult},
    snapshot::{CustomerFeatures, DatasetSnapshot, Transaction},
};
use chrono::{DateTime, NaiveDateTime};
use rusqlite::{params, types::Value, Connection};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 2^63: whole reals at or beyond this do not fit an i64 id.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

const TRANSACTION_COLUMNS: [&str; 4] =
    ["customer_id", "order_date", "purchase_amount", "currency"];

const CUSTOMER_COLUMNS: [&str; 11] = [
    "customer_id",
    "cluster",
    "monetary",
    "frequency",
    "recency",
    "purchase_variability",
    "tenure_days",
    "purchases_per_day",
    "spend_per_day",
    "recency_ratio",
    "customer_value_score",
];

/// Read when present; rows get None otherwise.
const OPTIONAL_CUSTOMER_COLUMNS: [&str; 2] = ["first_purchase", "last_purchase"];

pub struct DatasetStore {
    conn: Connection,
}

impl DatasetStore {
    pub fn open(path: &str) -> DashResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DashResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Wrap a connection whose schema was prepared elsewhere.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Create the bootstrap schema (default table names).
    pub fn migrate(&self) -> DashResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_dataset.sql"))?;
        Ok(())
    }

    // ── Writes (bootstrap schema) ──────────────────────────────

    pub fn insert_transaction(&self, t: &Transaction) -> DashResult<()> {
        write_transaction(&self.conn, t)
    }

    pub fn insert_customer(&self, c: &CustomerFeatures) -> DashResult<()> {
        write_customer(&self.conn, c)
    }

    /// Persist a whole snapshot in one SQLite transaction.
    pub fn write_snapshot(&mut self, snapshot: &DatasetSnapshot) -> DashResult<()> {
        let tx = self.conn.transaction()?;
        for c in snapshot.customers() {
            write_customer(&tx, c)?;
        }
        for t in snapshot.transactions() {
            write_transaction(&tx, t)?;
        }
        tx.commit()?;
        log::info!(
            "store: wrote {} customers and {} transactions",
            snapshot.customers().len(),
            snapshot.transactions().len()
        );
        Ok(())
    }

    // ── Load ───────────────────────────────────────────────────

    /// Read both tables named by `config` and normalize them into a snapshot.
    /// A missing table or required column is fatal.
    pub fn load_snapshot(&self, config: &DashConfig) -> DashResult<DatasetSnapshot> {
        let txn_table = config.transactions_table.as_str();
        let cust_table = config.customers_table.as_str();

        let txn_present = self.table_columns(txn_table)?;
        require_columns(txn_table, &txn_present, &TRANSACTION_COLUMNS)?;
        let cust_present = self.table_columns(cust_table)?;
        require_columns(cust_table, &cust_present, &CUSTOMER_COLUMNS)?;

        let transactions = self
            .fetch_rows(txn_table, &TRANSACTION_COLUMNS)?
            .iter()
            .enumerate()
            .map(|(i, values)| {
                let cells = Cells { table: txn_table, row: i + 1, values };
                Ok(Transaction {
                    customer_id: cells.identifier(0, "customer_id")?,
                    order_date: cells.timestamp(1, "order_date", config)?,
                    purchase_amount: cells.number(2, "purchase_amount")?,
                    currency: cells.text_or_empty(3, "currency")?,
                })
            })
            .collect::<DashResult<Vec<_>>>()?;

        let mut cust_columns: Vec<&str> = CUSTOMER_COLUMNS.to_vec();
        let optional: Vec<&str> = OPTIONAL_CUSTOMER_COLUMNS
            .iter()
            .copied()
            .filter(|c| cust_present.iter().any(|p| p == c))
            .collect();
        cust_columns.extend(&optional);
        let position = |name: &str| cust_columns.iter().position(|c| *c == name);
        let first_pos = position("first_purchase");
        let last_pos = position("last_purchase");

        let customers = self
            .fetch_rows(cust_table, &cust_columns)?
            .iter()
            .enumerate()
            .map(|(i, values)| {
                let cells = Cells { table: cust_table, row: i + 1, values };
                let customer_id = cells.identifier(0, "customer_id")?;
                let raw_cluster = cells.integer(1, "cluster")?;
                if !config.is_known_segment(raw_cluster) {
                    return Err(DashError::UnknownSegment {
                        customer_id,
                        segment: raw_cluster,
                    });
                }
                Ok(CustomerFeatures {
                    cluster: raw_cluster as u8,
                    monetary: cells.number(2, "monetary")?,
                    frequency: cells.number(3, "frequency")?,
                    recency: cells.number(4, "recency")?,
                    purchase_variability: cells.number(5, "purchase_variability")?,
                    tenure_days: cells.number(6, "tenure_days")?,
                    purchases_per_day: cells.number(7, "purchases_per_day")?,
                    spend_per_day: cells.number(8, "spend_per_day")?,
                    recency_ratio: cells.number(9, "recency_ratio")?,
                    customer_value_score: cells.number(10, "customer_value_score")?,
                    first_purchase: match first_pos {
                        Some(p) => cells.optional_timestamp(p, "first_purchase", config)?,
                        None => None,
                    },
                    last_purchase: match last_pos {
                        Some(p) => cells.optional_timestamp(p, "last_purchase", config)?,
                        None => None,
                    },
                    customer_id,
                })
            })
            .collect::<DashResult<Vec<_>>>()?;

        log::info!(
            "store: loaded {} transactions from '{txn_table}' and {} customers from '{cust_table}'",
            transactions.len(),
            customers.len()
        );
        DatasetSnapshot::new(transactions, customers)
    }

    fn table_columns(&self, table: &str) -> DashResult<Vec<String>> {
        check_identifier(table)?;
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(DashError::MissingTable { table: table.to_string() });
        }
        Ok(columns)
    }

    fn fetch_rows(&self, table: &str, columns: &[&str]) -> DashResult<Vec<Vec<Value>>> {
        let list = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {list} FROM \"{table}\" ORDER BY rowid"))?;
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn write_transaction(conn: &Connection, t: &Transaction) -> DashResult<()> {
    conn.execute(
        "INSERT INTO transactions (customer_id, order_date, purchase_amount, currency)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            &t.customer_id,
            t.order_date.format(TIMESTAMP_FORMAT).to_string(),
            t.purchase_amount,
            &t.currency,
        ],
    )?;
    Ok(())
}

fn write_customer(conn: &Connection, c: &CustomerFeatures) -> DashResult<()> {
    conn.execute(
        "INSERT INTO customer_features (
            customer_id, cluster, monetary, frequency, recency, purchase_variability,
            tenure_days, purchases_per_day, spend_per_day, recency_ratio,
            customer_value_score, first_purchase, last_purchase
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            &c.customer_id,
            c.cluster as i64,
            c.monetary,
            c.frequency,
            c.recency,
            c.purchase_variability,
            c.tenure_days,
            c.purchases_per_day,
            c.spend_per_day,
            c.recency_ratio,
            c.customer_value_score,
            c.first_purchase.map(|d| d.format(TIMESTAMP_FORMAT).to_string()),
            c.last_purchase.map(|d| d.format(TIMESTAMP_FORMAT).to_string()),
        ],
    )?;
    Ok(())
}

fn check_identifier(name: &str) -> DashResult<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DashError::InvalidIdentifier { name: name.to_string() })
    }
}

fn require_columns(table: &str, present: &[String], required: &[&str]) -> DashResult<()> {
    match required.iter().find(|r| !present.iter().any(|p| p == *r)) {
        Some(missing) => Err(DashError::MissingColumn {
            table: table.to_string(),
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// One fetched row plus enough context to name a bad cell.
struct Cells<'a> {
    table: &'a str,
    row: usize,
    values: &'a [Value],
}

impl Cells<'_> {
    fn null(&self, column: &str) -> DashError {
        DashError::NullValue {
            table: self.table.to_string(),
            column: column.to_string(),
            row: self.row,
        }
    }

    fn invalid(&self, column: &str, value: impl ToString) -> DashError {
        DashError::InvalidValue {
            table: self.table.to_string(),
            column: column.to_string(),
            row: self.row,
            value: value.to_string(),
        }
    }

    /// Integer ids are rendered in decimal; whole-valued reals (ids that
    /// passed through a float column) are accepted too, within i64 range.
    fn identifier(&self, i: usize, column: &str) -> DashResult<String> {
        match &self.values[i] {
            Value::Null => Err(self.null(column)),
            Value::Integer(n) => Ok(n.to_string()),
            Value::Real(r) if r.is_finite() && r.fract() == 0.0 && r.abs() < I64_BOUND => {
                Ok((*r as i64).to_string())
            }
            Value::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Value::Real(r) => Err(self.invalid(column, r)),
            Value::Text(s) => Err(self.invalid(column, format!("'{s}'"))),
            Value::Blob(_) => Err(self.invalid(column, "<blob>")),
        }
    }

    fn number(&self, i: usize, column: &str) -> DashResult<f64> {
        let n = match &self.values[i] {
            Value::Null => return Err(self.null(column)),
            Value::Integer(n) => *n as f64,
            Value::Real(r) => *r,
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(column, format!("'{s}'")))?,
            Value::Blob(_) => return Err(self.invalid(column, "<blob>")),
        };
        if n.is_finite() {
            Ok(n)
        } else {
            Err(self.invalid(column, n))
        }
    }

    fn integer(&self, i: usize, column: &str) -> DashResult<i64> {
        let n = self.number(i, column)?;
        if n.fract() == 0.0 {
            Ok(n as i64)
        } else {
            Err(self.invalid(column, n))
        }
    }

    fn text_or_empty(&self, i: usize, column: &str) -> DashResult<String> {
        match &self.values[i] {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(n) => Ok(n.to_string()),
            Value::Real(r) => Ok(r.to_string()),
            Value::Blob(_) => Err(self.invalid(column, "<blob>")),
        }
    }

    fn timestamp(&self, i: usize, column: &str, config: &DashConfig) -> DashResult<NaiveDateTime> {
        self.optional_timestamp(i, column, config)?
            .ok_or_else(|| self.null(column))
    }

    /// Text goes through the configured formats; integers are Unix seconds.
    fn optional_timestamp(
        &self,
        i: usize,
        column: &str,
        config: &DashConfig,
    ) -> DashResult<Option<NaiveDateTime>> {
        let bad = |value: String| DashError::InvalidTimestamp {
            table: self.table.to_string(),
            column: column.to_string(),
            row: self.row,
            value,
        };
        match &self.values[i] {
            Value::Null => Ok(None),
            Value::Text(s) => config
                .parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| bad(s.clone())),
            Value::Integer(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|dt| Some(dt.naive_utc()))
                .ok_or_else(|| bad(secs.to_string())),
            Value::Real(r) => Err(bad(r.to_string())),
            Value::Blob(_) => Err(bad("<blob>".into())),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table '{table}' not found")]
    MissingTable { table: String },

    #[error("Required column '{column}' missing from table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Null value in {table}.{column} at row {row}")]
    NullValue { table: String, column: String, row: usize },

    #[error("Invalid value in {table}.{column} at row {row}: {value}")]
    InvalidValue { table: String, column: String, row: usize, value: String },

    #[error("Unparseable timestamp in {table}.{column} at row {row}: '{value}'")]
    InvalidTimestamp { table: String, column: String, row: usize, value: String },

    #[error("Customer '{customer_id}' has segment {segment}, which is not a known segment")]
    UnknownSegment { customer_id: String, segment: i64 },

    #[error("Duplicate customer_id '{customer_id}' in customer table")]
    DuplicateCustomer { customer_id: String },

    #[error("Invalid table name '{name}'")]
    InvalidIdentifier { name: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: chrono::NaiveDate, end: chrono::NaiveDate },

    #[error("Unknown feature '{name}'")]
    UnknownFeature { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DashResult<T> = Result<T, DashError>;

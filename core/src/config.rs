use crate::types::{SegmentId, DEFAULT_SEGMENTS};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashConfig {
    /// Table holding one row per purchase.
    #[serde(default = "default_transactions_table")]
    pub transactions_table: String,
    /// Table holding one row per customer with its segment label.
    #[serde(default = "default_customers_table")]
    pub customers_table: String,
    /// Every segment label a customer row may carry.
    #[serde(default = "default_segments")]
    pub segments: Vec<SegmentId>,
    /// strftime patterns tried, in order, after RFC 3339.
    /// Date-only patterns resolve to midnight.
    #[serde(default = "default_timestamp_formats")]
    pub timestamp_formats: Vec<String>,
}

fn default_transactions_table() -> String {
    "transactions".into()
}

fn default_customers_table() -> String {
    "customer_features".into()
}

fn default_segments() -> Vec<SegmentId> {
    DEFAULT_SEGMENTS.to_vec()
}

fn default_timestamp_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d %H:%M:%S%.f".into(),
        "%Y-%m-%dT%H:%M:%S%.f".into(),
        "%Y-%m-%d %H:%M".into(),
        "%Y-%m-%dT%H:%M".into(),
        "%Y-%m-%d".into(),
        "%m/%d/%Y %H:%M".into(),
        "%m/%d/%Y".into(),
    ]
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            transactions_table: default_transactions_table(),
            customers_table: default_customers_table(),
            segments: default_segments(),
            timestamp_formats: default_timestamp_formats(),
        }
    }
}

impl DashConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DashConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.segments.is_empty() {
            anyhow::bail!("{path}: segment list must not be empty");
        }
        Ok(config)
    }

    pub fn is_known_segment(&self, segment: i64) -> bool {
        self.segments.iter().any(|&s| i64::from(s) == segment)
    }

    /// Normalize a raw timestamp string. Zone offsets are dropped after
    /// converting to the instant's local wall-clock time.
    pub fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        for fmt in &self.timestamp_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(dt);
            }
            if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_timestamp_shapes() {
        let config = DashConfig::default();
        let expected = NaiveDate::from_ymd_opt(2023, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap();

        assert_eq!(config.parse_timestamp("2023-03-14 09:26:53"), Some(expected));
        assert_eq!(config.parse_timestamp("2023-03-14T09:26:53"), Some(expected));
        assert_eq!(config.parse_timestamp("2023-03-14T09:26:53+00:00"), Some(expected));
        assert_eq!(
            config.parse_timestamp("2023-03-14"),
            NaiveDate::from_ymd_opt(2023, 3, 14).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(config.parse_timestamp("not a date"), None);
    }

    #[test]
    fn minutes_without_seconds_are_accepted() {
        let config = DashConfig::default();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(config.parse_timestamp("2024-01-05 09:30"), Some(expected));
        assert_eq!(config.parse_timestamp("2024-01-05T09:30"), Some(expected));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: DashConfig =
            serde_json::from_str(r#"{ "customers_table": "clusters" }"#).unwrap();
        assert_eq!(config.customers_table, "clusters");
        assert_eq!(config.transactions_table, "transactions");
        assert_eq!(config.segments, vec![0, 1]);
    }
}

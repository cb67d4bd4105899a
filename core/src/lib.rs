//! segdash-core: the query and aggregation core behind the customer
//! segmentation dashboard.
//!
//! Two immutable base tables (transactions, customer features) are loaded
//! once into a `DatasetSnapshot`. Every filter change runs one pure pass
//! over it: filter → KPIs → segment distribution and profile → monthly
//! rollup. Rendering is left to the caller.

pub mod config;
pub mod dashboard;
pub mod distribution;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod profile;
pub mod rng;
pub mod rollup;
pub mod snapshot;
pub mod store;
pub mod synth;
pub mod types;

pub use dashboard::{Dashboard, DashboardFrame};
pub use error::{DashError, DashResult};
pub use filter::{DateRange, FilterParams, FilteredView};

//! dash-runner: headless shell over the segment dashboard core.
//!
//! Usage:
//!   dash-runner --db shop.db
//!   dash-runner --seed 12345 --customers 2000 --write-db demo.db
//!   dash-runner --db shop.db --ipc-mode

mod labels;

use anyhow::Result;
use chrono::NaiveDate;
use labels::SegmentLabels;
use segdash_core::{
    config::DashConfig,
    dashboard::{Dashboard, DashboardFrame},
    distribution::{Feature, FeatureDistribution},
    filter::{DateRange, FilterParams},
    metrics::{Aggregate, Kpi},
    snapshot::{CustomerFeatures, Transaction},
    store::DatasetStore,
    synth::{self, SynthParams},
    types::SegmentId,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    ApplyFilters {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        segments: Option<Vec<SegmentId>>,
    },
    Feature {
        name: String,
    },
    RawData {
        limit: Option<usize>,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    date_bounds: Option<(NaiveDate, NaiveDate)>,
    segment_labels: &'a SegmentLabels,
    frame: DashboardFrame,
}

#[derive(serde::Serialize)]
struct FeatureReply<'a> {
    segment_labels: &'a SegmentLabels,
    distribution: FeatureDistribution,
}

#[derive(serde::Serialize)]
struct RawDataReply<'v, 'a> {
    transactions: &'v [&'a Transaction],
    customers: &'v [&'a CustomerFeatures],
    total_transactions: usize,
    total_customers: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 500usize);
    let orphan_rate = parse_arg(&args, "--orphan-rate", 0.0f64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = arg_value(&args, "--db");
    let write_db = arg_value(&args, "--write-db");

    let config = match arg_value(&args, "--config") {
        Some(path) => DashConfig::load(path)?,
        None => DashConfig::default(),
    };
    let labels = match arg_value(&args, "--labels") {
        Some(path) => SegmentLabels::load(path)?,
        None => SegmentLabels::default(),
    };

    if !ipc_mode {
        println!("Customer Segmentation Dashboard (dash-runner)");
        match db {
            Some(path) => println!("  db:        {path}"),
            None => println!("  synthetic: seed {seed}, {customers} customers"),
        }
        println!("  tables:    {} / {}", config.transactions_table, config.customers_table);
        println!();
    }

    let snapshot = match db {
        Some(path) => DatasetStore::open(path)?.load_snapshot(&config)?,
        None => synth::generate(&SynthParams {
            seed,
            customers,
            orphan_rate,
            ..SynthParams::default()
        })?,
    };

    if let Some(path) = write_db {
        let mut out = DatasetStore::open(path)?;
        out.migrate()?;
        out.write_snapshot(&snapshot)?;
        if !ipc_mode {
            println!("Dataset written to {path}");
        }
    }

    let dashboard = Dashboard::new(Arc::new(snapshot));
    let mut params = initial_params(&dashboard, &config)?;

    if ipc_mode {
        run_ipc_loop(&dashboard, &config, &labels, &mut params)?;
    } else {
        print_summary(&dashboard.refresh(&params), &labels);
    }

    Ok(())
}

/// Full date range and every configured segment, as the dashboard opens.
fn initial_params(dashboard: &Dashboard, config: &DashConfig) -> Result<FilterParams> {
    let range = match dashboard.date_bounds() {
        Some((lo, hi)) => Some(DateRange::new(lo, hi)?),
        None => None,
    };
    Ok(FilterParams::new(range, config.segments.iter().copied()))
}

fn run_ipc_loop(
    dashboard: &Dashboard,
    config: &DashConfig,
    labels: &SegmentLabels,
    params: &mut FilterParams,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        if let IpcCommand::Quit = cmd {
            break;
        }
        match handle_command(dashboard, config, labels, params, cmd) {
            Ok(reply) => writeln!(stdout, "{reply}")?,
            Err(e) => {
                log::warn!("ipc: command failed: {e}");
                write_error(&mut stdout, &e.to_string())?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(out, "{err_json}")?;
    out.flush()?;
    Ok(())
}

/// Execute one command and return its JSON reply line.
fn handle_command(
    dashboard: &Dashboard,
    config: &DashConfig,
    labels: &SegmentLabels,
    params: &mut FilterParams,
    cmd: IpcCommand,
) -> Result<String> {
    match cmd {
        IpcCommand::GetState => state_json(dashboard, labels, params),
        IpcCommand::ApplyFilters { start, end, segments } => {
            let range = resolve_range(start, end)?;
            let segments = segments.unwrap_or_else(|| config.segments.clone());
            *params = FilterParams::new(range, segments);
            state_json(dashboard, labels, params)
        }
        IpcCommand::Feature { name } => {
            let feature: Feature = name.parse()?;
            let view = dashboard.apply_filters(params);
            let reply = FeatureReply {
                segment_labels: labels,
                distribution: dashboard.compute_feature_distribution(&view, feature),
            };
            Ok(serde_json::to_string(&reply)?)
        }
        IpcCommand::RawData { limit } => {
            let view = dashboard.apply_filters(params);
            let limit = limit.unwrap_or(100);
            let reply = RawDataReply {
                transactions: &view.transactions[..limit.min(view.transactions.len())],
                customers: &view.customers[..limit.min(view.customers.len())],
                total_transactions: view.transactions.len(),
                total_customers: view.customers.len(),
            };
            Ok(serde_json::to_string(&reply)?)
        }
        IpcCommand::Quit => Ok(String::new()),
    }
}

fn state_json(dashboard: &Dashboard, labels: &SegmentLabels, params: &FilterParams) -> Result<String> {
    let state = UiState {
        date_bounds: dashboard.date_bounds(),
        segment_labels: labels,
        frame: dashboard.refresh(params),
    };
    Ok(serde_json::to_string(&state)?)
}

/// The date filter applies only once both ends are picked; a half-open
/// request means no date restriction.
fn resolve_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Option<DateRange>> {
    match (start, end) {
        (Some(s), Some(e)) => Ok(Some(DateRange::new(s, e)?)),
        _ => Ok(None),
    }
}

fn fmt_agg(a: &Aggregate, decimals: usize) -> String {
    match a.value() {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

fn fmt_kpi(kpi: &Kpi, decimals: usize) -> String {
    let delta = match kpi.delta_pct.value() {
        Some(d) => format!("{d:+.1}%"),
        None => "n/a".to_string(),
    };
    format!("{} (vs. all: {delta})", fmt_agg(&kpi.value, decimals))
}

fn print_summary(frame: &DashboardFrame, labels: &SegmentLabels) {
    let range = match frame.filters.date_range {
        Some(r) => format!("{} .. {}", r.start(), r.end()),
        None => "all dates".to_string(),
    };

    println!("=== FILTER ===");
    println!("  dates:          {range}");
    println!(
        "  segments:       {}",
        frame
            .filters
            .segments
            .iter()
            .map(|s| labels.name(*s))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  transactions:   {}", frame.transaction_count);
    println!("  customers:      {}", frame.customer_count);

    println!();
    println!("=== KPIs ===");
    println!("  customers:      {}", fmt_kpi(&frame.kpis.customer_count, 0));
    println!("  revenue:        ${}", fmt_kpi(&frame.kpis.total_revenue, 2));
    println!("  avg order:      ${}", fmt_kpi(&frame.kpis.avg_order_value, 2));
    println!("  avg frequency:  {}", fmt_kpi(&frame.kpis.avg_frequency, 2));

    println!();
    println!("=== SEGMENTS ===");
    if frame.segment_profiles.is_empty() {
        println!("  (No customers match the filter)");
    }
    for (share, p) in frame.segment_distribution.iter().zip(&frame.segment_profiles) {
        let n = p.normalized;
        println!(
            "  {:<22} {:>6} ({:>5.1}%) | M {:>9.2} F {:>6.2} R {:>6.1} V {:>6.2} | radar [{:.2} {:.2} {:.2} {:.2}]",
            labels.name(p.segment),
            share.count,
            share.percentage,
            p.monetary_mean,
            p.frequency_mean,
            p.recency_mean,
            p.value_score_mean,
            n.monetary,
            n.frequency,
            n.recency,
            n.value_score,
        );
    }

    println!();
    println!("=== MONTHLY (last 6 buckets) ===");
    if frame.monthly.is_empty() {
        println!("  (No transactions in range)");
    }
    let skip = frame.monthly.len().saturating_sub(6);
    for b in frame.monthly.iter().skip(skip) {
        println!(
            "  {} | {:<22} | revenue ${:>10.2} | aov ${:>7.2} | {:>5} customers | {:>5} orders",
            b.year_month,
            labels.key_name(b.segment),
            b.total_revenue,
            b.avg_order_value,
            b.unique_customers,
            b.order_count,
        );
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

use anyhow::Context;
use rust_decimal::{Decimal, RoundingStrategy};
use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

/// Upper bound on the default worker count.
const MAX_DEFAULT_WORKERS: usize = 8;

/// Most datasets accepted per kind: one per compared year.
const MAX_DATASETS_PER_KIND: usize = 2;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .init();
}

/// Size the global rayon pool used by aggregation. Returns the worker count.
pub fn configure_workers(workers: Option<usize>) -> anyhow::Result<usize> {
    let workers = workers.unwrap_or_else(|| std::cmp::min(num_cpus::get(), MAX_DEFAULT_WORKERS));
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .context("Failed to configure worker pool")?;
    tracing::info!(action = "configure", component = "workers", workers = workers, "Worker pool ready");
    Ok(workers)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Whole-number rendering with thousands separators: `1234.6` -> `1,235`.
pub fn format_count(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let digits = rounded.abs().trunc().to_string();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}", sign, group_thousands(&digits))
}

/// Whole-dollar rendering: `1234.5` -> `$1,234`, `-50` -> `-$50`.
pub fn format_money(value: Decimal) -> String {
    let amount = format_count(value);
    match amount.strip_prefix('-') {
        Some(unsigned) => format!("-${}", unsigned),
        None => format!("${}", amount),
    }
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0");
        }
    }

    if args.init {
        return Ok(());
    }

    if args.approvals.is_empty() && args.cancellations.is_empty() {
        anyhow::bail!("at least one --approvals or --cancellations dataset is required");
    }

    for (flag, inputs) in [
        ("--approvals", &args.approvals),
        ("--cancellations", &args.cancellations),
    ] {
        if inputs.len() > MAX_DATASETS_PER_KIND {
            anyhow::bail!(
                "{} accepts at most {} datasets (one per year)",
                flag,
                MAX_DATASETS_PER_KIND
            );
        }
        if let [first, second] = inputs.as_slice() {
            if first.year == second.year {
                anyhow::bail!("{} given twice for year {}", flag, first.year);
            }
        }
    }

    Ok(())
}

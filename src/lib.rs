pub mod aggregate;
pub mod args;
pub mod categories;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod pivot;
pub mod records;
pub mod report;
pub mod stats;
pub mod units;
pub mod utils;
pub mod yoy;

pub use aggregate::{aggregate, aggregate_by_unit, Comparison, Measures, Year, YearAggregate};
pub use args::Args;
pub use categories::{load_category_rules, Category, CategoryRules};
pub use error::{ReportError, SchemaError};
pub use pivot::{pivot, Axis, Filter, Measure, WideTable};
pub use records::{normalize, DatasetKind, NormalizedRecord, RawRecord};
pub use report::{build_report, run_report};
pub use stats::ReportResult;
pub use units::{load_unit_names, UnitDirectory, UnitKey};
pub use yoy::{with_delta, Delta};

use anyhow::Result;
use std::path::Path;

/// Write the default `category_rules.txt` and `unit_names.txt` into `dir`.
pub fn init_defaults(dir: &Path) -> Result<()> {
    config::init_default(&categories::RULES_FILE, dir)?;
    config::init_default(&units::UNIT_NAMES_FILE, dir)?;
    Ok(())
}

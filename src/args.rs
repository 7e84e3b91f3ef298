use clap::Parser;
use std::path::PathBuf;

use crate::loader::DatasetArg;
use crate::pivot::Filter;

#[derive(Parser, Debug)]
#[command(
    name = "yoy-report",
    about = "Compare two years of account approvals and cancellations by unit and account type",
    version,
    long_about = None
)]
pub struct Args {
    /// Approvals CSV export for one year, as YEAR=PATH (repeat for the second year)
    #[arg(short, long, value_name = "YEAR=PATH")]
    pub approvals: Vec<DatasetArg>,

    /// Cancellations CSV export for one year, as YEAR=PATH (repeat for the second year)
    #[arg(short, long, value_name = "YEAR=PATH")]
    pub cancellations: Vec<DatasetArg>,

    /// Unit key to report on, or "Total" for all units combined
    #[arg(short, long, default_value = "Total")]
    pub unit: Filter,

    /// List the selectable units and exit
    #[arg(long)]
    pub list_units: bool,

    /// Path to custom category rules file
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Path to custom unit display names file
    #[arg(long)]
    pub unit_names: Option<PathBuf>,

    /// Directory to write wide and long CSV tables into
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Initialize category_rules.txt and unit_names.txt with defaults
    #[arg(long)]
    pub init: bool,
}

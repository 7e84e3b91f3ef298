use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, warn};

use crate::aggregate::Year;
use crate::error::ReportError;
use crate::records::{DatasetKind, NormalizedRecord, RawRecord};
use crate::stats::DateRange;

/// A `YEAR=PATH` command-line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetArg {
    pub year: Year,
    pub path: PathBuf,
}

impl FromStr for DatasetArg {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::InvalidDatasetArg(s.to_string());
        let (year, path) = s.split_once('=').ok_or_else(invalid)?;
        let year: Year = year.trim().parse().map_err(|_| invalid())?;
        let path = path.trim();
        if path.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            year,
            path: PathBuf::from(path),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: DatasetKind,
    pub year: Year,
    pub records: Vec<RawRecord>,
}

/// Read every data row of a CSV export, keyed by its header names.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read CSV header row")?
        .clone();

    let mut records = Vec::new();
    for (idx, result) in csv_reader.records().enumerate() {
        // header is line 1
        let row = result.with_context(|| format!("CSV parse error at line {}", idx + 2))?;
        records.push(RawRecord::new(
            headers
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        ));
    }

    Ok(records)
}

pub fn load_dataset(path: &Path, kind: DatasetKind, year: Year) -> Result<Dataset> {
    let start_time = Instant::now();
    info!(action = "start", component = "dataset_load", kind = %kind, year = year, file_path = ?path, "Loading dataset");

    if !path.exists() {
        anyhow::bail!("{} file for {} not found at {:?}", kind, year, path);
    }

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let records =
        read_records(file).with_context(|| format!("Failed to read {} from {:?}", kind, path))?;

    info!(
        action = "complete",
        component = "dataset_load",
        kind = %kind,
        year = year,
        record_count = records.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Dataset loaded"
    );

    Ok(Dataset {
        kind,
        year,
        records,
    })
}

/// Earliest and latest record dates, if any record carries a date.
pub fn date_range(records: &[NormalizedRecord]) -> Option<DateRange> {
    let mut dates = records.iter().filter_map(|record| record.date);
    let first = dates.next()?;
    let (earliest, latest) = dates.fold((first, first), |(lo, hi), date| {
        (lo.min(date), hi.max(date))
    });
    Some(DateRange::new(earliest, latest))
}

/// Warn about records dated outside the year their dataset is labeled with.
pub fn check_year_label(records: &[NormalizedRecord], kind: DatasetKind, year: Year) -> usize {
    use chrono::Datelike;

    let outside = records
        .iter()
        .filter_map(|record| record.date)
        .filter(|date| date.year() != year)
        .count();
    if outside > 0 {
        warn!(
            action = "validate",
            component = "dataset_year",
            kind = %kind,
            year = year,
            outside_count = outside,
            "Records dated outside the dataset's year label"
        );
    }
    outside
}

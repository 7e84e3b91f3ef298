//! Reshape a [`Comparison`] into a year-by-column table.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, warn};

use crate::aggregate::{Comparison, Measures, Year};
use crate::categories::Category;
use crate::error::ReportError;
use crate::units::UnitKey;
use crate::yoy::Delta;

/// Column label used when the aggregate was grouped by unit only.
pub const ALL_CATEGORIES_LABEL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Filter {
    Total,
    Unit(UnitKey),
}

impl FromStr for Filter {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("total") {
            return Ok(Filter::Total);
        }
        s.parse()
            .map(Filter::Unit)
            .map_err(|_| ReportError::InvalidFilter(s.to_string()))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Total => write!(f, "Total"),
            Filter::Unit(unit) => write!(f, "{}", unit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Count,
    VolumeSum,
    ProfitSum,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Count, Measure::VolumeSum, Measure::ProfitSum];

    pub fn name(self) -> &'static str {
        match self {
            Measure::Count => "count",
            Measure::VolumeSum => "volume_sum",
            Measure::ProfitSum => "profit_sum",
        }
    }

    pub fn is_monetary(self) -> bool {
        !matches!(self, Measure::Count)
    }

    pub fn of(self, measures: &Measures) -> Decimal {
        match self {
            Measure::Count => Decimal::from(measures.count),
            Measure::VolumeSum => measures.volume_sum,
            Measure::ProfitSum => measures.profit_sum,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the columns of a pivoted table are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One column per category, holding the given measure.
    Category(Measure),
    /// One column per measure, categories collapsed.
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub label: String,
    /// Measure the column's values are drawn from.
    pub measure: Measure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRow {
    pub year: Year,
    pub values: Vec<Decimal>,
}

/// One (series, year, value) point; the shape chart renderers consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongRow {
    pub series: String,
    pub year: Year,
    pub value: Decimal,
}

/// Rows are years in ascending order followed by an optional YOY row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideTable {
    pub(crate) columns: Vec<Column>,
    pub(crate) rows: Vec<YearRow>,
    pub(crate) yoy: Option<Vec<Delta>>,
}

impl WideTable {
    pub fn new(columns: Vec<Column>, mut rows: Vec<YearRow>) -> Self {
        rows.sort_by_key(|row| row.year);
        Self {
            columns,
            rows,
            yoy: None,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[YearRow] {
        &self.rows
    }

    pub fn yoy(&self) -> Option<&[Delta]> {
        self.yoy.as_deref()
    }

    pub fn years(&self) -> Vec<Year> {
        self.rows.iter().map(|row| row.year).collect()
    }

    fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.label == label)
    }

    pub fn value(&self, year: Year, column: &str) -> Option<Decimal> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.year == year)
            .map(|row| row.values[idx])
    }

    pub fn delta(&self, column: &str) -> Option<Delta> {
        let idx = self.column_index(column)?;
        self.yoy.as_ref().map(|deltas| deltas[idx])
    }

    /// Long form of the year rows; the YOY row is not part of it.
    pub fn to_long(&self) -> Vec<LongRow> {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(idx, column)| {
                self.rows.iter().map(move |row| LongRow {
                    series: column.label.clone(),
                    year: row.year,
                    value: row.values[idx],
                })
            })
            .collect()
    }
}

fn category_label(category: &Option<Category>) -> String {
    match category {
        Some(category) => category.to_string(),
        None => ALL_CATEGORIES_LABEL.to_string(),
    }
}

/// Pivot `comparison` into one row per year, restricted by `filter`.
///
/// Every year of the comparison gets a row; a unit with no records in a year
/// gets zeros there. Missing cells are zero, never omitted.
pub fn pivot(comparison: &Comparison, filter: Filter, axis: Axis) -> WideTable {
    let start_time = Instant::now();

    if let Filter::Unit(unit) = filter {
        if !comparison.units().contains(&unit) {
            warn!(action = "filter", component = "pivot", unit = unit, "Unit has no records in any year");
        }
    }

    let mut cells: BTreeMap<Year, BTreeMap<Option<Category>, Measures>> = comparison
        .years()
        .map(|year| (year, BTreeMap::new()))
        .collect();

    for (year, key, measures) in comparison.rows() {
        if let Filter::Unit(unit) = filter {
            if key.unit != unit {
                continue;
            }
        }
        let slot = match axis {
            Axis::Category(_) => key.category.clone(),
            Axis::Metric => None,
        };
        // within one year, bounded by the magnitude check in `aggregate`
        *cells.entry(year).or_default().entry(slot).or_default() += *measures;
    }

    let slots: Vec<(Option<Category>, Column)> = match axis {
        Axis::Category(measure) => cells
            .values()
            .flat_map(|by_slot| by_slot.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|slot| {
                let label = category_label(&slot);
                (slot, Column { label, measure })
            })
            .collect(),
        Axis::Metric => Measure::ALL
            .iter()
            .map(|&measure| {
                (
                    None,
                    Column {
                        label: measure.name().to_string(),
                        measure,
                    },
                )
            })
            .collect(),
    };

    let rows = cells
        .iter()
        .map(|(&year, by_slot)| YearRow {
            year,
            values: slots
                .iter()
                .map(|(slot, column)| {
                    by_slot
                        .get(slot)
                        .map(|measures| column.measure.of(measures))
                        .unwrap_or(Decimal::ZERO)
                })
                .collect(),
        })
        .collect();

    let columns = slots.into_iter().map(|(_, column)| column).collect();
    let table = WideTable::new(columns, rows);

    info!(
        action = "complete",
        component = "pivot",
        filter = %filter,
        axis = ?axis,
        column_count = table.columns.len(),
        row_count = table.rows.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Pivot completed"
    );
    table
}

//! Per-year grouping of normalized records, and the two-year union of those
//! groups that every pivot reads from.

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;
use std::time::Instant;
use tracing::info;

use crate::categories::Category;
use crate::error::ReportError;
use crate::pivot::Filter;
use crate::records::NormalizedRecord;
use crate::units::UnitKey;

pub type Year = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grouping {
    /// One group per (unit key, category).
    UnitAndCategory,
    /// One group per unit key, categories collapsed.
    Unit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Measures {
    pub count: u64,
    pub volume_sum: Decimal,
    pub profit_sum: Decimal,
}

impl AddAssign<&NormalizedRecord> for Measures {
    fn add_assign(&mut self, record: &NormalizedRecord) {
        self.count += 1;
        self.volume_sum += record.volume;
        self.profit_sum += record.profit;
    }
}

impl AddAssign<Measures> for Measures {
    fn add_assign(&mut self, other: Measures) {
        self.count += other.count;
        self.volume_sum += other.volume_sum;
        self.profit_sum += other.profit_sum;
    }
}

/// `category` is `None` for aggregates grouped by unit only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub unit: UnitKey,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearAggregate {
    year: Year,
    grouping: Grouping,
    groups: BTreeMap<GroupKey, Measures>,
}

impl YearAggregate {
    pub fn year(&self) -> Year {
        self.year
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &Measures)> {
        self.groups.iter()
    }

    pub fn get(&self, unit: UnitKey, category: Option<&Category>) -> Option<&Measures> {
        self.groups.get(&GroupKey {
            unit,
            category: category.cloned(),
        })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn units(&self) -> BTreeSet<UnitKey> {
        self.groups.keys().map(|key| key.unit).collect()
    }

    /// Measures summed over every group.
    pub fn total(&self) -> Measures {
        let mut total = Measures::default();
        for measures in self.groups.values() {
            total += *measures;
        }
        total
    }
}

fn merge_groups(
    mut left: BTreeMap<GroupKey, Measures>,
    right: BTreeMap<GroupKey, Measures>,
) -> BTreeMap<GroupKey, Measures> {
    for (key, measures) in right {
        *left.entry(key).or_default() += measures;
    }
    left
}

/// Sum of absolute values, `None` if it does not fit in a `Decimal`.
fn magnitude(mut values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value.abs()))
}

/// Every group sum, and any sum of groups within the year, is bounded by the
/// magnitude of its column, so a bounded magnitude rules out overflow later.
fn check_magnitude(records: &[NormalizedRecord], year: Year) -> Result<(), ReportError> {
    if magnitude(records.iter().map(|record| record.volume)).is_none() {
        return Err(ReportError::SumOverflow {
            year,
            field: "volume",
        });
    }
    if magnitude(records.iter().map(|record| record.profit)).is_none() {
        return Err(ReportError::SumOverflow {
            year,
            field: "profit",
        });
    }
    Ok(())
}

fn aggregate_with(
    records: &[NormalizedRecord],
    year: Year,
    grouping: Grouping,
) -> Result<YearAggregate, ReportError> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "aggregation",
        year = year,
        grouping = ?grouping,
        record_count = records.len(),
        "Aggregating records"
    );
    check_magnitude(records, year)?;

    // Sums are exact decimals, so the fold order does not affect the result.
    let groups = records
        .par_iter()
        .fold(BTreeMap::<GroupKey, Measures>::new, |mut acc, record| {
            let key = GroupKey {
                unit: record.unit,
                category: match grouping {
                    Grouping::UnitAndCategory => Some(record.category.clone()),
                    Grouping::Unit => None,
                },
            };
            *acc.entry(key).or_default() += record;
            acc
        })
        .reduce(BTreeMap::new, merge_groups);

    info!(
        action = "complete",
        component = "aggregation",
        year = year,
        group_count = groups.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Aggregation completed"
    );

    Ok(YearAggregate {
        year,
        grouping,
        groups,
    })
}

/// Group `records` by (unit key, category) and reduce each group to its
/// count, volume sum and profit sum.
///
/// Fails with [`ReportError::SumOverflow`] when the year's monetary values
/// cannot be summed exactly.
pub fn aggregate(records: &[NormalizedRecord], year: Year) -> Result<YearAggregate, ReportError> {
    aggregate_with(records, year, Grouping::UnitAndCategory)
}

/// Same as [`aggregate`] with the category dimension collapsed.
pub fn aggregate_by_unit(
    records: &[NormalizedRecord],
    year: Year,
) -> Result<YearAggregate, ReportError> {
    aggregate_with(records, year, Grouping::Unit)
}

/// Union of per-year aggregates sharing one grouping mode.
///
/// Each year stays a distinct set of rows; nothing is summed across years.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    grouping: Option<Grouping>,
    years: BTreeMap<Year, YearAggregate>,
}

impl Comparison {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_aggregates<I>(aggregates: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = YearAggregate>,
    {
        let mut comparison = Self::new();
        for aggregate in aggregates {
            comparison.insert(aggregate)?;
        }
        Ok(comparison)
    }

    pub fn insert(&mut self, aggregate: YearAggregate) -> Result<(), ReportError> {
        if let Some(expected) = self.grouping {
            if expected != aggregate.grouping {
                return Err(ReportError::GroupingMismatch {
                    expected,
                    found: aggregate.grouping,
                });
            }
        }
        if self.years.contains_key(&aggregate.year) {
            return Err(ReportError::DuplicateYear(aggregate.year));
        }

        self.grouping = Some(aggregate.grouping);
        self.years.insert(aggregate.year, aggregate);
        Ok(())
    }

    pub fn grouping(&self) -> Option<Grouping> {
        self.grouping
    }

    /// Years in ascending order.
    pub fn years(&self) -> impl Iterator<Item = Year> + '_ {
        self.years.keys().copied()
    }

    pub fn get(&self, year: Year) -> Option<&YearAggregate> {
        self.years.get(&year)
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &YearAggregate> {
        self.years.values()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Every (year, group, measures) row, ordered by year then group.
    pub fn rows(&self) -> impl Iterator<Item = (Year, &GroupKey, &Measures)> {
        self.years.values().flat_map(|aggregate| {
            aggregate
                .groups()
                .map(move |(key, measures)| (aggregate.year, key, measures))
        })
    }

    /// Unit keys observed in any year.
    pub fn units(&self) -> BTreeSet<UnitKey> {
        self.years
            .values()
            .flat_map(|aggregate| aggregate.groups.keys().map(|key| key.unit))
            .collect()
    }

    /// Selectable filters: `Total` first, then every observed unit key.
    pub fn filters(&self) -> Vec<Filter> {
        filter_options(self.units())
    }
}

/// `Total` followed by one `Unit` filter per key, in key order.
pub fn filter_options(units: impl IntoIterator<Item = UnitKey>) -> Vec<Filter> {
    let units: BTreeSet<UnitKey> = units.into_iter().collect();
    std::iter::once(Filter::Total)
        .chain(units.into_iter().map(Filter::Unit))
        .collect()
}

use chrono::NaiveDate;
use std::fmt;

use crate::aggregate::{Measures, Year};
use crate::pivot::{Filter, WideTable};
use crate::records::DatasetKind;
use crate::report::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateRange {
    pub fn new(earliest: NaiveDate, latest: NaiveDate) -> Self {
        Self { earliest, latest }
    }

    pub fn days(&self) -> i64 {
        (self.latest - self.earliest).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let earliest = self.earliest.format("%B %-d, %Y");
        let latest = self.latest.format("%B %-d, %Y");
        if self.days() > 0 {
            write!(f, "{} to {} ({} days)", earliest, latest, self.days())
        } else {
            write!(f, "{} to {}", earliest, latest)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub kind: DatasetKind,
    pub year: Year,
    pub record_count: usize,
    pub date_range: Option<DateRange>,
    /// Records dated outside `year`.
    pub outside_year: usize,
    pub total: Measures,
}

#[derive(Debug, Clone)]
pub struct ViewResult {
    pub view: View,
    pub table: WideTable,
}

#[derive(Debug, Clone)]
pub struct ReportResult {
    pub filter: Filter,
    pub datasets: Vec<DatasetSummary>,
    pub views: Vec<ViewResult>,
    /// `Total` followed by every unit seen in any dataset.
    pub filters: Vec<Filter>,
}

impl ReportResult {
    pub fn view(&self, name: &str) -> Option<&ViewResult> {
        self.views.iter().find(|result| result.view.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_display() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        assert_eq!(range.days(), 60);
        assert_eq!(range.to_string(), "January 1, 2024 to March 1, 2024 (60 days)");

        let single = DateRange::new(range.earliest, range.earliest);
        assert_eq!(single.to_string(), "January 1, 2024 to January 1, 2024");
    }
}

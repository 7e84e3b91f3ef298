//! Error types for the normalization and comparison stages.

use thiserror::Error;

use crate::aggregate::Grouping;

/// Raised by the normalizer when a row does not have the expected shape.
///
/// `row` is the zero-based index of the record within its dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("row {row}: required field `{field}` is missing or blank")]
    MissingField { field: &'static str, row: usize },
    #[error("row {row}: field `{field}` has invalid value {value:?}")]
    InvalidValue {
        field: &'static str,
        value: String,
        row: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("an aggregate for year {0} is already part of this comparison")]
    DuplicateYear(i32),
    #[error("cannot combine {found:?} aggregate with {expected:?} comparison")]
    GroupingMismatch { expected: Grouping, found: Grouping },
    #[error("invalid filter {0:?}: expected \"Total\" or an integer unit key")]
    InvalidFilter(String),
    #[error("invalid dataset argument {0:?}: expected YEAR=PATH")]
    InvalidDatasetArg(String),
    #[error("{field} values for year {year} are too large to sum exactly")]
    SumOverflow { year: i32, field: &'static str },
}

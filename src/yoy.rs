//! Year-over-year percentage change.

use rust_decimal::Decimal;
use std::fmt;

use crate::pivot::WideTable;

/// Placeholder shown when the previous year's value is zero.
pub const UNDEFINED_DELTA: &str = "N/A";

/// Placeholder shown when the change does not fit in a `Decimal`.
pub const OUT_OF_RANGE_DELTA: &str = "out of range";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    /// Percentage change rounded to one decimal place.
    Change(Decimal),
    /// The previous value is zero.
    Undefined,
    /// A tiny previous value against a huge current one.
    OutOfRange,
}

impl Delta {
    pub fn between(previous: Decimal, current: Decimal) -> Self {
        if previous.is_zero() {
            return Delta::Undefined;
        }
        current
            .checked_sub(previous)
            .and_then(|change| change.checked_div(previous))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Delta::OutOfRange, |percent| Delta::Change(percent.round_dp(1)))
    }

    pub fn percent(&self) -> Option<Decimal> {
        match self {
            Delta::Change(percent) => Some(*percent),
            Delta::Undefined | Delta::OutOfRange => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Delta::Undefined)
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delta::Change(percent) => write!(f, "{:.1}%", percent),
            Delta::Undefined => f.write_str(UNDEFINED_DELTA),
            Delta::OutOfRange => f.write_str(OUT_OF_RANGE_DELTA),
        }
    }
}

/// Return a copy of `table` with a YOY row comparing its two year rows.
///
/// Tables without exactly two year rows come back unchanged.
pub fn with_delta(table: &WideTable) -> WideTable {
    let mut result = table.clone();

    let [previous, current] = table.rows() else {
        return result;
    };

    result.yoy = Some(
        previous
            .values
            .iter()
            .zip(&current.values)
            .map(|(&prev, &curr)| Delta::between(prev, curr))
            .collect(),
    );
    result
}

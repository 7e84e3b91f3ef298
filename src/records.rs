//! Raw spreadsheet rows and their normalized form.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::categories::{Category, CategoryRules};
use crate::error::SchemaError;
use crate::units::UnitKey;

/// Category given to cancellations exported without an account type column.
pub const UNSPECIFIED_CATEGORY: &str = "Unspecified";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    Approvals,
    Cancellations,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Approvals => write!(f, "approvals"),
            DatasetKind::Cancellations => write!(f, "cancellations"),
        }
    }
}

/// One source row, as (field name, cell text) pairs in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub unit: UnitKey,
    /// Trimmed account type as it appeared in the source.
    pub account_type: String,
    pub category: Category,
    pub volume: Decimal,
    pub profit: Decimal,
    pub id: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Unit,
    AccountType,
    Volume,
    Profit,
    Id,
    Date,
}

const FIELD_COUNT: usize = 6;

impl Field {
    const ALL: [Field; FIELD_COUNT] = [
        Field::Unit,
        Field::AccountType,
        Field::Volume,
        Field::Profit,
        Field::Id,
        Field::Date,
    ];

    fn name(self) -> &'static str {
        match self {
            Field::Unit => "unit key",
            Field::AccountType => "account type",
            Field::Volume => "volume",
            Field::Profit => "profit",
            Field::Id => "identifier",
            Field::Date => "date",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Unit => &["iso", "unit", "unit_key"],
            Field::AccountType => &["account_type", "type"],
            Field::Volume => &["monthly_volume", "volume"],
            Field::Profit => &["profit"],
            Field::Id => &["mid", "id", "account_id"],
            Field::Date => &["date", "approval_date", "cancellation_date"],
        }
    }
}

/// Lowercase, trim, and collapse runs of whitespace, hyphens and underscores
/// into a single `_`. A leading byte-order mark is dropped.
pub fn normalize_field_name(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// The recognized cells of one record, indexed by [`Field`].
struct CanonicalFields<'a> {
    cells: [Option<&'a str>; FIELD_COUNT],
}

impl<'a> CanonicalFields<'a> {
    fn from_raw(record: &'a RawRecord) -> Self {
        let mut cells = [None; FIELD_COUNT];
        for (name, value) in record.fields() {
            let name = normalize_field_name(name);
            if let Some(idx) = Field::ALL
                .iter()
                .position(|field| field.aliases().contains(&name.as_str()))
            {
                // first matching column wins
                cells[idx].get_or_insert(value.as_str());
            }
        }
        Self { cells }
    }

    /// Trimmed, non-empty cell text.
    fn get(&self, field: Field) -> Option<&'a str> {
        let idx = Field::ALL.iter().position(|f| *f == field)?;
        self.cells[idx].map(str::trim).filter(|v| !v.is_empty())
    }
}

fn invalid(field: Field, value: &str, row: usize) -> SchemaError {
    SchemaError::InvalidValue {
        field: field.name(),
        value: value.to_string(),
        row,
    }
}

fn parse_unit(text: &str) -> Option<UnitKey> {
    if let Ok(unit) = text.parse::<UnitKey>() {
        return Some(unit);
    }
    // spreadsheet exports sometimes render integer columns as `111.0`
    let value = Decimal::from_str(text).ok()?;
    if value.fract().is_zero() {
        value.to_u32()
    } else {
        None
    }
}

/// Parse a monetary cell such as `1234.5`, `$1,234.50` or `(250.00)`.
pub fn parse_money(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    let value = Decimal::from_str(digits)
        .or_else(|_| Decimal::from_scientific(digits))
        .ok()?;
    Some(if negative { -value } else { value })
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    // drop any time-of-day part
    let date_part = text.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

fn money_field(
    fields: &CanonicalFields<'_>,
    field: Field,
    row: usize,
) -> Result<Decimal, SchemaError> {
    match fields.get(field) {
        Some(text) => parse_money(text).ok_or_else(|| invalid(field, text, row)),
        None => Ok(Decimal::ZERO),
    }
}

fn normalize_record(
    record: &RawRecord,
    row: usize,
    kind: DatasetKind,
    rules: &CategoryRules,
) -> Result<NormalizedRecord, SchemaError> {
    let fields = CanonicalFields::from_raw(record);

    let unit_text = fields
        .get(Field::Unit)
        .ok_or(SchemaError::MissingField {
            field: Field::Unit.name(),
            row,
        })?;
    let unit = parse_unit(unit_text).ok_or_else(|| invalid(Field::Unit, unit_text, row))?;

    let (account_type, category) = match (fields.get(Field::AccountType), kind) {
        (Some(account_type), _) => (account_type.to_string(), rules.classify(account_type)),
        (None, DatasetKind::Cancellations) => (
            String::new(),
            Category::Other(UNSPECIFIED_CATEGORY.to_string()),
        ),
        (None, DatasetKind::Approvals) => {
            return Err(SchemaError::MissingField {
                field: Field::AccountType.name(),
                row,
            })
        }
    };

    let volume = money_field(&fields, Field::Volume, row)?;
    let profit = money_field(&fields, Field::Profit, row)?;

    let date = match fields.get(Field::Date) {
        Some(text) => Some(parse_date(text).ok_or_else(|| invalid(Field::Date, text, row))?),
        None => None,
    };

    Ok(NormalizedRecord {
        unit,
        account_type,
        category,
        volume,
        profit,
        id: fields.get(Field::Id).map(str::to_string),
        date,
    })
}

/// Convert raw rows into [`NormalizedRecord`]s, preserving input order.
///
/// The unit key is required for every dataset; the account type is required
/// for approvals only. Blank cells count as absent.
pub fn normalize(
    raw: &[RawRecord],
    kind: DatasetKind,
    rules: &CategoryRules,
) -> Result<Vec<NormalizedRecord>, SchemaError> {
    raw.iter()
        .enumerate()
        .map(|(row, record)| normalize_record(record, row, kind, rules))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn approval(unit: &str, account_type: &str, volume: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("ISO", unit),
            ("Account Type", account_type),
            ("Monthly Volume", volume),
        ])
    }

    #[test]
    fn test_normalize_field_name() {
        assert_eq!(normalize_field_name("  Account Type "), "account_type");
        assert_eq!(normalize_field_name("MONTHLY  VOLUME"), "monthly_volume");
        assert_eq!(normalize_field_name("\u{feff}ISO"), "iso");
        assert_eq!(normalize_field_name("account-type"), "account_type");
        assert_eq!(normalize_field_name("Account__Type"), "account_type");
    }

    #[test]
    fn test_normalize_approval() {
        let records = normalize(
            &[approval(" 111 ", "new ", "$1,000.50")],
            DatasetKind::Approvals,
            &CategoryRules::builtin(),
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.unit, 111);
        assert_eq!(record.account_type, "new");
        assert_eq!(record.category, Category::NewAccount);
        assert_eq!(record.volume, Decimal::from_str("1000.50").unwrap());
        assert_eq!(record.profit, Decimal::ZERO);
        assert_eq!(record.id, None);
    }

    #[test]
    fn test_no_record_dropped_and_order_kept() {
        let raw = vec![
            approval("111", "Upgrade", "10"),
            approval("112", "Conversion", ""),
            approval("113", "new", "5"),
        ];
        let records =
            normalize(&raw, DatasetKind::Approvals, &CategoryRules::builtin()).unwrap();
        let units: Vec<_> = records.iter().map(|r| r.unit).collect();
        assert_eq!(units, vec![111, 112, 113]);
        assert_eq!(records[0].category, Category::Other("Upgrade".into()));
        assert_eq!(records[1].volume, Decimal::ZERO);
    }

    #[test]
    fn test_missing_unit_is_schema_error() {
        let raw = vec![
            approval("111", "new", "1"),
            RawRecord::from_pairs([("Account Type", "new")]),
        ];
        let err = normalize(&raw, DatasetKind::Approvals, &CategoryRules::builtin()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                field: "unit key",
                row: 1
            }
        );
    }

    #[test]
    fn test_missing_account_type_for_approvals_is_schema_error() {
        let raw = vec![RawRecord::from_pairs([("ISO", "111"), ("Account Type", "  ")])];
        let err = normalize(&raw, DatasetKind::Approvals, &CategoryRules::builtin()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingField {
                field: "account type",
                row: 0
            }
        ));
    }

    #[test]
    fn test_cancellation_without_account_type() {
        let raw = vec![RawRecord::from_pairs([
            ("iso", "204"),
            ("MID", "A-17"),
            ("monthly volume", "2500"),
            ("Profit", "(120.25)"),
            ("Date", "2025-03-14"),
        ])];
        let records =
            normalize(&raw, DatasetKind::Cancellations, &CategoryRules::builtin()).unwrap();
        let record = &records[0];
        assert_eq!(record.category, Category::Other(UNSPECIFIED_CATEGORY.into()));
        assert_eq!(record.id.as_deref(), Some("A-17"));
        assert_eq!(record.profit, Decimal::from_str("-120.25").unwrap());
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 3, 14));
    }

    #[test]
    fn test_invalid_values_are_schema_errors() {
        let rules = CategoryRules::builtin();
        let err = normalize(&[approval("ISO-9", "new", "1")], DatasetKind::Approvals, &rules)
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { field: "unit key", .. }));

        let err = normalize(&[approval("9", "new", "lots")], DatasetKind::Approvals, &rules)
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidValue {
                field: "volume",
                value: "lots".into(),
                row: 0
            }
        );

        let raw = RawRecord::from_pairs([("ISO", "9"), ("Type", "new"), ("Date", "March")]);
        let err = normalize(&[raw], DatasetKind::Approvals, &rules).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { field: "date", .. }));
    }

    #[test]
    fn test_parse_unit_accepts_float_rendering() {
        assert_eq!(parse_unit("111"), Some(111));
        assert_eq!(parse_unit("111.0"), Some(111));
        assert_eq!(parse_unit("111.5"), None);
        assert_eq!(parse_unit("-3"), None);
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money(""), Some(Decimal::ZERO));
        assert_eq!(parse_money("$ 1,234.50"), Decimal::from_f64(1234.5));
        assert_eq!(parse_money("(50)"), Some(Decimal::from(-50)));
        assert_eq!(parse_money("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_money("n/a"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 4);
        assert_eq!(parse_date("2024-07-04"), expected);
        assert_eq!(parse_date("07/04/2024"), expected);
        assert_eq!(parse_date("2024-07-04 00:00:00"), expected);
        assert_eq!(parse_date("July 4th"), None);
    }
}

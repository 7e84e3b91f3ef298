use anyhow::{Context, Result};
use prettytable::{format, Cell, Row, Table};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::aggregate::{
    aggregate, aggregate_by_unit, filter_options, Comparison, Grouping, Measures,
};
use crate::categories::{load_category_rules, CategoryRules};
use crate::loader::{self, check_year_label, date_range, Dataset};
use crate::pivot::{pivot, Axis, Filter, Measure, WideTable};
use crate::records::{normalize, DatasetKind};
use crate::stats::{DatasetSummary, ReportResult, ViewResult};
use crate::units::UnitDirectory;
use crate::utils::{format_count, format_money};
use crate::yoy::with_delta;
use crate::Args;

/// One dashboard table: which dataset it reads, how that dataset is grouped,
/// and what the columns are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    /// Used for export file names.
    pub name: &'static str,
    pub title: &'static str,
    pub kind: DatasetKind,
    pub grouping: Grouping,
    pub axis: Axis,
}

pub const VIEWS: [View; 3] = [
    View {
        name: "approvals_count",
        title: "Approvals by Account Type",
        kind: DatasetKind::Approvals,
        grouping: Grouping::UnitAndCategory,
        axis: Axis::Category(Measure::Count),
    },
    View {
        name: "approvals_volume",
        title: "Approved Monthly Volume by Account Type",
        kind: DatasetKind::Approvals,
        grouping: Grouping::UnitAndCategory,
        axis: Axis::Category(Measure::VolumeSum),
    },
    View {
        name: "cancellations",
        title: "Cancellations",
        kind: DatasetKind::Cancellations,
        grouping: Grouping::Unit,
        axis: Axis::Metric,
    },
];

/// Run the whole pipeline over already loaded datasets.
pub fn build_report(
    datasets: &[Dataset],
    rules: &CategoryRules,
    filter: Filter,
) -> Result<ReportResult> {
    let start_time = Instant::now();
    let mut comparisons: HashMap<(DatasetKind, Grouping), Comparison> = HashMap::new();
    let mut summaries = Vec::new();

    for dataset in datasets {
        let records = normalize(&dataset.records, dataset.kind, rules)
            .with_context(|| format!("Invalid {} data for {}", dataset.kind, dataset.year))?;
        info!(
            action = "normalized",
            component = "normalizer",
            kind = %dataset.kind,
            year = dataset.year,
            record_count = records.len(),
            "Records normalized"
        );

        let mut groupings = Vec::new();
        for view in VIEWS.iter().filter(|view| view.kind == dataset.kind) {
            if !groupings.contains(&view.grouping) {
                groupings.push(view.grouping);
            }
        }

        for grouping in groupings {
            let year_aggregate = match grouping {
                Grouping::UnitAndCategory => aggregate(&records, dataset.year),
                Grouping::Unit => aggregate_by_unit(&records, dataset.year),
            }
            .with_context(|| format!("Cannot aggregate {} for {}", dataset.kind, dataset.year))?;
            comparisons
                .entry((dataset.kind, grouping))
                .or_default()
                .insert(year_aggregate)
                .with_context(|| format!("Cannot add {} for {}", dataset.kind, dataset.year))?;
        }

        // bounded by the aggregation check above
        let mut total = Measures::default();
        for record in &records {
            total += record;
        }

        summaries.push(DatasetSummary {
            kind: dataset.kind,
            year: dataset.year,
            record_count: records.len(),
            date_range: date_range(&records),
            outside_year: check_year_label(&records, dataset.kind, dataset.year),
            total,
        });
    }

    let views: Vec<ViewResult> = VIEWS
        .iter()
        .filter_map(|view| {
            let comparison = comparisons.get(&(view.kind, view.grouping))?;
            Some(ViewResult {
                view: *view,
                table: with_delta(&pivot(comparison, filter, view.axis)),
            })
        })
        .collect();

    let filters = filter_options(comparisons.values().flat_map(Comparison::units));

    info!(
        action = "complete",
        component = "report",
        filter = %filter,
        view_count = views.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Report built"
    );

    Ok(ReportResult {
        filter,
        datasets: summaries,
        views,
        filters,
    })
}

pub fn run_report(args: &Args) -> Result<ReportResult> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "report", "Starting YOY report");

    let rules = load_category_rules(args.rules.as_deref())?;

    let mut datasets = Vec::new();
    for (kind, inputs) in [
        (DatasetKind::Approvals, &args.approvals),
        (DatasetKind::Cancellations, &args.cancellations),
    ] {
        for input in inputs {
            datasets.push(loader::load_dataset(&input.path, kind, input.year)?);
        }
    }

    let result = build_report(&datasets, &rules, args.unit)?;

    info!(
        action = "complete",
        component = "run",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Report completed successfully"
    );
    Ok(result)
}

fn format_value(value: rust_decimal::Decimal, measure: Measure) -> String {
    if measure.is_monetary() {
        format_money(value)
    } else {
        format_count(value)
    }
}

/// Finalize a table into display strings: a header row, then one row per
/// year and the YOY row if present. The first column holds the row label.
pub fn render_table(table: &WideTable) -> Vec<Vec<String>> {
    let mut rendered = Vec::with_capacity(table.rows().len() + 2);

    rendered.push(
        std::iter::once("Year".to_string())
            .chain(table.columns().iter().map(|column| column.label.clone()))
            .collect(),
    );

    for row in table.rows() {
        rendered.push(
            std::iter::once(row.year.to_string())
                .chain(
                    table
                        .columns()
                        .iter()
                        .zip(&row.values)
                        .map(|(column, value)| format_value(*value, column.measure)),
                )
                .collect(),
        );
    }

    if let Some(deltas) = table.yoy() {
        rendered.push(
            std::iter::once("YOY".to_string())
                .chain(deltas.iter().map(|delta| delta.to_string()))
                .collect(),
        );
    }

    rendered
}

/// Lay rendered rows out as a console table: bold header, right-aligned values.
fn build_table(rendered: &[Vec<String>]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);

    let mut rows = rendered.iter();
    if let Some(header) = rows.next() {
        table.add_row(Row::new(
            header
                .iter()
                .map(|cell| Cell::new(cell).style_spec("bFg"))
                .collect(),
        ));
    }
    for row in rows {
        table.add_row(Row::new(
            row.iter()
                .enumerate()
                .map(|(idx, cell)| {
                    if idx == 0 {
                        Cell::new(cell).style_spec("b")
                    } else {
                        Cell::new(cell).style_spec("r")
                    }
                })
                .collect(),
        ));
    }
    table
}

fn summary_line(summary: &DatasetSummary) -> String {
    format!(
        "{} {}: {} records, volume {}, profit {}",
        capitalize(summary.kind),
        summary.year,
        format_count(summary.record_count.into()),
        format_money(summary.total.volume_sum),
        format_money(summary.total.profit_sum)
    )
}

fn capitalize(kind: DatasetKind) -> String {
    let text = kind.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

pub fn print_report(result: &ReportResult, units: &UnitDirectory) {
    println!(
        "\n--- YOY Report: {} ---",
        units.display_filter(result.filter)
    );

    for summary in &result.datasets {
        println!("{}", summary_line(summary));
        if let Some(range) = &summary.date_range {
            println!("  Date range: {}", range);
        }
        if summary.outside_year > 0 {
            println!(
                "  Warning: {} records dated outside {}",
                format_count(summary.outside_year.into()),
                summary.year
            );
        }
    }

    for view_result in &result.views {
        println!("\n{}", view_result.view.title);
        if view_result.table.columns().is_empty() {
            println!("  No records for this selection");
            continue;
        }
        build_table(&render_table(&view_result.table)).printstd();
    }
}

pub fn print_units(result: &ReportResult, units: &UnitDirectory) {
    println!("\nAvailable units ({}):", result.filters.len());
    for filter in &result.filters {
        println!("- {}", units.display_filter(*filter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawRecord;

    fn dataset(kind: DatasetKind, year: i32, rows: &[(&str, &str, &str, &str)]) -> Dataset {
        Dataset {
            kind,
            year,
            records: rows
                .iter()
                .map(|(iso, account_type, volume, profit)| {
                    RawRecord::from_pairs([
                        ("ISO", *iso),
                        ("Account Type", *account_type),
                        ("Monthly Volume", *volume),
                        ("Profit", *profit),
                    ])
                })
                .collect(),
        }
    }

    fn sample_datasets() -> Vec<Dataset> {
        vec![
            dataset(
                DatasetKind::Approvals,
                2024,
                &[("111", "new", "1000", ""), ("111", "new", "500", "")],
            ),
            dataset(DatasetKind::Approvals, 2025, &[("111", "New", "2000", "")]),
            dataset(
                DatasetKind::Cancellations,
                2024,
                &[("111", "", "1200", "300"), ("222", "", "800", "100")],
            ),
            dataset(
                DatasetKind::Cancellations,
                2025,
                &[("111", "", "600", "150")],
            ),
        ]
    }

    #[test]
    fn test_build_report_views() {
        let result =
            build_report(&sample_datasets(), &CategoryRules::builtin(), Filter::Unit(111)).unwrap();

        assert_eq!(result.views.len(), 3);
        assert_eq!(result.datasets.len(), 4);
        assert_eq!(
            result.filters,
            vec![Filter::Total, Filter::Unit(111), Filter::Unit(222)]
        );

        let volume = &result.view("approvals_volume").unwrap().table;
        assert_eq!(volume.delta("New account").unwrap().to_string(), "33.3%");

        let cancellations = &result.view("cancellations").unwrap().table;
        let yoy: Vec<String> = cancellations
            .yoy()
            .unwrap()
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(yoy, vec!["0.0%", "-50.0%", "-50.0%"]);
    }

    #[test]
    fn test_views_without_data_are_skipped() {
        let datasets = vec![dataset(DatasetKind::Approvals, 2024, &[("7", "Upgrade", "5", "")])];
        let result = build_report(&datasets, &CategoryRules::builtin(), Filter::Total).unwrap();
        assert_eq!(result.views.len(), 2);
        assert!(result.view("cancellations").is_none());
        assert!(result.views.iter().all(|v| v.table.yoy().is_none()));
    }

    #[test]
    fn test_schema_error_aborts_report() {
        let datasets = vec![dataset(DatasetKind::Approvals, 2024, &[("111", "", "5", "")])];
        let err = build_report(&datasets, &CategoryRules::builtin(), Filter::Total).unwrap_err();
        assert!(err.downcast_ref::<crate::error::SchemaError>().is_some());
    }

    #[test]
    fn test_render_table_formats_cells() {
        let result =
            build_report(&sample_datasets(), &CategoryRules::builtin(), Filter::Total).unwrap();
        let rendered = render_table(&result.view("cancellations").unwrap().table);

        assert_eq!(rendered[0], vec!["Year", "count", "volume_sum", "profit_sum"]);
        assert_eq!(rendered[1], vec!["2024", "2", "$2,000", "$400"]);
        assert_eq!(rendered[2], vec!["2025", "1", "$600", "$150"]);
        assert_eq!(rendered[3], vec!["YOY", "-50.0%", "-70.0%", "-62.5%"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize(DatasetKind::Approvals), "Approvals");
    }

    #[test]
    fn test_build_table_lays_out_every_row() {
        let result =
            build_report(&sample_datasets(), &CategoryRules::builtin(), Filter::Total).unwrap();
        let rendered = render_table(&result.view("cancellations").unwrap().table);
        let table = build_table(&rendered);

        assert_eq!(table.len(), rendered.len());
        let text = table.to_string();
        assert!(text.contains("volume_sum"));
        assert!(text.contains("$2,000"));
        assert!(text.contains("-62.5%"));
    }

    #[test]
    fn test_summary_line_includes_totals() {
        let result =
            build_report(&sample_datasets(), &CategoryRules::builtin(), Filter::Total).unwrap();
        let summary = result
            .datasets
            .iter()
            .find(|s| s.kind == DatasetKind::Cancellations && s.year == 2024)
            .unwrap();

        assert_eq!(summary.total.count, 2);
        assert_eq!(
            summary_line(summary),
            "Cancellations 2024: 2 records, volume $2,000, profit $400"
        );
    }

    #[test]
    fn test_oversized_money_fails_report() {
        let huge = "70000000000000000000000000000";
        let datasets = vec![dataset(
            DatasetKind::Approvals,
            2024,
            &[("111", "new", huge, ""), ("111", "new", huge, "")],
        )];
        let err = build_report(&datasets, &CategoryRules::builtin(), Filter::Total).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::ReportError>(),
            Some(crate::error::ReportError::SumOverflow { year: 2024, .. })
        ));
    }
}

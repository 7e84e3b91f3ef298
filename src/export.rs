//! CSV export of report tables.

use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::pivot::WideTable;
use crate::stats::ReportResult;

/// Write the wide table, raw values plus the YOY row.
pub fn write_wide<W: Write>(table: &WideTable, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    let mut header = vec!["year".to_string()];
    header.extend(table.columns().iter().map(|column| column.label.clone()));
    wtr.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![row.year.to_string()];
        record.extend(row.values.iter().map(|value| value.to_string()));
        wtr.write_record(&record)?;
    }

    if let Some(deltas) = table.yoy() {
        let mut record = vec!["YOY".to_string()];
        record.extend(deltas.iter().map(|delta| delta.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the long form, one (series, year, value) row per cell.
pub fn write_long<W: Write>(table: &WideTable, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in table.to_long() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `<view>_wide.csv` and `<view>_long.csv` for every view into
/// `output_dir`, creating it if needed. Returns the written paths.
pub fn export_views(output_dir: &Path, result: &ReportResult) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let mut written = Vec::new();
    for view_result in &result.views {
        let name = view_result.view.name;

        let wide_path = output_dir.join(format!("{}_wide.csv", name));
        let file = fs::File::create(&wide_path)
            .with_context(|| format!("Failed to create {:?}", wide_path))?;
        write_wide(&view_result.table, file)?;

        let long_path = output_dir.join(format!("{}_long.csv", name));
        let file = fs::File::create(&long_path)
            .with_context(|| format!("Failed to create {:?}", long_path))?;
        write_long(&view_result.table, file)?;

        info!(action = "export", component = "csv_export", view = name, wide = ?wide_path, long = ?long_path, "View exported");
        println!("  Generated: {}", wide_path.display());
        println!("  Generated: {}", long_path.display());
        written.push(wide_path);
        written.push(long_path);
    }

    Ok(written)
}

use crate::error::Result;
use crate::reports::AggregationResult;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Header and body of the band x period pivot, shared by the CSV writer
/// and the terminal preview. The last row holds unclassified entities.
fn pivot_records(result: &AggregationResult) -> Vec<Vec<String>> {
    let mut header = vec!["Band".to_string()];
    header.extend(result.periods.iter().cloned());
    let mut out = vec![header];
    for row in &result.counts {
        let mut rec = vec![row.band.label().to_string()];
        rec.extend(row.counts.iter().map(|c| c.to_string()));
        out.push(rec);
    }
    if result.unclassified.iter().any(|c| *c > 0) {
        let mut rec = vec![crate::bands::Band::Unknown.label().to_string()];
        rec.extend(result.unclassified.iter().map(|c| c.to_string()));
        out.push(rec);
    }
    out
}

/// Write the pivot with one column per period; its width is only known
/// at runtime, so it bypasses serde.
pub fn write_pivot_csv(path: &Path, result: &AggregationResult) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for rec in pivot_records(result) {
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn preview_pivot(result: &AggregationResult) {
    let mut builder = Builder::default();
    for rec in pivot_records(result) {
        builder.push_record(rec);
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

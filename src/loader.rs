use crate::error::{ReportError, Result};
use crate::types::LossRecord;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Accepted header names for the columns the report needs. Sheets from
/// different months have used different headers for the same data.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub entity: Vec<String>,
    pub ratio: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        let owned =
            |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
        Self {
            entity: owned(&["Tên TBA", "Tên trạm", "Tên đường dây", "Mã TBA", "entity_id"]),
            ratio: owned(&[
                "Tỷ lệ tổn thất",
                "Tỷ lệ tổn thất (%)",
                "Tỷ lệ TT",
                "Tổn thất (%)",
                "loss_ratio",
            ]),
        }
    }
}

impl ColumnMapping {
    /// Add caller-supplied aliases ahead of the defaults.
    pub fn with_extra(mut self, entity: &[String], ratio: &[String]) -> Self {
        self.entity.splice(0..0, entity.iter().cloned());
        self.ratio.splice(0..0, ratio.iter().cloned());
        self
    }
}

fn find_column(headers: &csv::StringRecord, aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        let alias = alias.trim().to_lowercase();
        headers
            .iter()
            .position(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase() == alias)
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    /// False when the sheet has no recognised loss-ratio column.
    pub has_ratio_column: bool,
}

/// Read one CSV export, tagging every row with `label`.
///
/// A missing entity column fails the source. A missing ratio column does
/// not: rows load with no ratio and the aggregator reports "no data".
pub fn load_records(
    path: &Path,
    label: &str,
    mapping: &ColumnMapping,
) -> Result<(Vec<LossRecord>, LoadReport)> {
    let file = File::open(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = rdr.headers()?.clone();

    let entity_idx =
        find_column(&headers, &mapping.entity).ok_or_else(|| ReportError::MissingColumn {
            path: path.to_path_buf(),
            column: mapping.entity.first().cloned().unwrap_or_default(),
        })?;
    let ratio_idx = find_column(&headers, &mapping.ratio);
    if ratio_idx.is_none() {
        warn!(path = %path.display(), "no loss-ratio column found");
    }

    let mut report = LoadReport {
        has_ratio_column: ratio_idx.is_some(),
        ..LoadReport::default()
    };
    let mut records = Vec::new();
    for result in rdr.records() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.parse_errors += 1;
                continue;
            }
        };
        let entity = match row.get(entity_idx).map(str::trim) {
            Some(e) if !e.is_empty() => e,
            _ => {
                report.parse_errors += 1;
                continue;
            }
        };
        let ratio = ratio_idx
            .and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        records.push(LossRecord::new(entity, label, ratio));
    }
    report.loaded_rows = records.len();

    info!(
        path = %path.display(),
        label,
        rows = report.loaded_rows,
        skipped = report.parse_errors,
        "loaded source"
    );
    Ok((records, report))
}

/// A sheet to load and the period label its rows are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub path: PathBuf,
    pub label: String,
}

impl Source {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// Result of loading one source. A failed source contributes no rows.
#[derive(Debug)]
pub enum SourceOutcome {
    Loaded {
        records: Vec<LossRecord>,
        report: LoadReport,
    },
    /// The file was read but produced no usable rows.
    Empty(LoadReport),
    Failed(ReportError),
}

impl SourceOutcome {
    pub fn records(&self) -> &[LossRecord] {
        match self {
            SourceOutcome::Loaded { records, .. } => records,
            _ => &[],
        }
    }
}

/// Parsed sources kept between menu actions, keyed by path and label.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: HashMap<Source, (Vec<LossRecord>, LoadReport)>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything so the next load re-reads the files.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_or_load(
        &mut self,
        source: &Source,
        mapping: &ColumnMapping,
    ) -> Result<(Vec<LossRecord>, LoadReport)> {
        if let Some(hit) = self.entries.get(source) {
            return Ok(hit.clone());
        }
        let loaded = load_records(&source.path, &source.label, mapping)?;
        self.entries.insert(source.clone(), loaded.clone());
        Ok(loaded)
    }
}

/// Load every source. Failures are reported per source and never stop
/// the others from loading.
pub fn load_sources(
    sources: &[Source],
    mapping: &ColumnMapping,
    cache: &mut SourceCache,
) -> Vec<(Source, SourceOutcome)> {
    sources
        .iter()
        .map(|source| {
            let outcome = match cache.get_or_load(source, mapping) {
                Ok((records, report)) if records.is_empty() => SourceOutcome::Empty(report),
                Ok((records, report)) => SourceOutcome::Loaded { records, report },
                Err(e) => {
                    warn!(path = %source.path.display(), error = %e, "source skipped");
                    SourceOutcome::Failed(e)
                }
            };
            (source.clone(), outcome)
        })
        .collect()
}

/// Concatenate the rows of every successfully loaded source, in order.
pub fn merge_records(outcomes: &[(Source, SourceOutcome)]) -> Vec<LossRecord> {
    outcomes
        .iter()
        .flat_map(|(_, outcome)| outcome.records().iter().cloned())
        .collect()
}

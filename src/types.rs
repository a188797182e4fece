use crate::bands::Band;
use serde::Serialize;
use tabled::Tabled;

/// One source row: an asset, the reporting period it was loaded under,
/// and the raw loss-ratio cell (if the sheet had one).
#[derive(Debug, Clone, PartialEq)]
pub struct LossRecord {
    pub entity_id: String,
    pub period_label: String,
    pub loss_ratio: Option<String>,
}

impl LossRecord {
    pub fn new(
        entity_id: impl Into<String>,
        period_label: impl Into<String>,
        loss_ratio: Option<&str>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            period_label: period_label.into(),
            loss_ratio: loss_ratio.map(str::to_string),
        }
    }
}

fn display_ratio(v: &Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn display_pct(v: &f64) -> String {
    format!("{:.2}%", v)
}

/// A deduplicated, classified record as shown in the detail table.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DetailRow {
    #[serde(rename = "Entity")]
    #[tabled(rename = "Entity")]
    pub entity_id: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period_label: String,
    #[serde(rename = "LossRatio")]
    #[tabled(rename = "LossRatio", display_with = "display_ratio")]
    pub loss_ratio: Option<f64>,
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: Band,
}

/// Counts for one band across every period, in period order.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BandCounts {
    pub band: Band,
    pub counts: Vec<usize>,
}

/// One slice of the proportion (donut) view.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ShareRow {
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: Band,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct", display_with = "display_pct")]
    pub share_pct: f64,
}

/// Band distribution of a single period, the basis for percentage display.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PeriodShare {
    pub period_label: String,
    pub rows: Vec<ShareRow>,
    /// Distinct classified entities in the period (the donut's centre label).
    pub total: usize,
}

/// JSON export of one report run.
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub periods: &'a [String],
    pub counts: &'a [BandCounts],
    pub unclassified: &'a [usize],
    pub share: &'a PeriodShare,
    pub filter: String,
    pub detail_rows: usize,
}

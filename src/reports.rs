// Band aggregation: dedup, classify, pivot by period, and the share view.
use crate::bands::{classify_str, Band, BandFilter};
use crate::types::{BandCounts, DetailRow, LossRecord, PeriodShare, ShareRow};
use crate::util::{parse_ratio, percent};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// No rows, or no row carries a loss-ratio value at all.
    NoData,
    Ready(AggregationResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    /// Distinct period labels in first-seen order; the pivot's columns.
    pub periods: Vec<String>,
    /// One entry per band in `Band::ALL` order, always all six.
    pub counts: Vec<BandCounts>,
    /// Per period, entities whose ratio could not be read.
    pub unclassified: Vec<usize>,
    pub share: PeriodShare,
    pub detail_rows: Vec<DetailRow>,
}

impl AggregationResult {
    /// Distinct entities of `period` in `band`; 0 for unknown combinations.
    pub fn count(&self, band: Band, period: &str) -> usize {
        let Some(col) = self.periods.iter().position(|p| p == period) else {
            return 0;
        };
        self.counts
            .iter()
            .find(|row| row.band == band)
            .map(|row| row.counts[col])
            .unwrap_or(0)
    }

    /// Sum of the banded counts for `period` (unclassified excluded).
    pub fn period_total(&self, period: &str) -> usize {
        Band::ALL.iter().map(|b| self.count(*b, period)).sum()
    }

    /// Detail rows whose band matches `filter`, ordered by band. Rows keep
    /// their load order within a band.
    pub fn filter_detail(&self, filter: BandFilter) -> Vec<DetailRow> {
        let mut rows: Vec<DetailRow> = self
            .detail_rows
            .iter()
            .filter(|r| filter.matches(r.band))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.band);
        rows
    }
}

/// Classify and cross-tabulate `records`.
///
/// Records are deduplicated on `(entity_id, period_label)`, first one wins.
/// The share view uses `current_label`, or the first period seen when no
/// record carries that label.
pub fn aggregate(records: &[LossRecord], current_label: &str) -> Aggregation {
    let blank = |r: &LossRecord| {
        r.loss_ratio
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
    };
    if records.iter().all(blank) {
        debug!(rows = records.len(), "no loss-ratio values, nothing to aggregate");
        return Aggregation::NoData;
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut periods: Vec<String> = Vec::new();
    let mut detail_rows: Vec<DetailRow> = Vec::new();
    for r in records {
        if !seen.insert((r.entity_id.as_str(), r.period_label.as_str())) {
            continue;
        }
        if !periods.contains(&r.period_label) {
            periods.push(r.period_label.clone());
        }
        detail_rows.push(DetailRow {
            entity_id: r.entity_id.clone(),
            period_label: r.period_label.clone(),
            loss_ratio: parse_ratio(r.loss_ratio.as_deref()),
            band: classify_str(r.loss_ratio.as_deref()),
        });
    }

    let mut counts: Vec<BandCounts> = Band::ALL
        .iter()
        .map(|b| BandCounts {
            band: *b,
            counts: vec![0; periods.len()],
        })
        .collect();
    let mut unclassified = vec![0usize; periods.len()];
    for row in &detail_rows {
        let col = periods
            .iter()
            .position(|p| *p == row.period_label)
            .unwrap_or_default();
        match Band::ALL.iter().position(|b| *b == row.band) {
            Some(idx) => counts[idx].counts[col] += 1,
            None => unclassified[col] += 1,
        }
    }

    let share_col = periods
        .iter()
        .position(|p| p == current_label)
        .unwrap_or(0);
    let total: usize = counts.iter().map(|row| row.counts[share_col]).sum();
    let share = PeriodShare {
        period_label: periods[share_col].clone(),
        rows: counts
            .iter()
            .map(|row| ShareRow {
                band: row.band,
                count: row.counts[share_col],
                share_pct: percent(row.counts[share_col], total),
            })
            .collect(),
        total,
    };

    debug!(
        input = records.len(),
        distinct = detail_rows.len(),
        periods = periods.len(),
        share_period = %share.period_label,
        "aggregated loss bands"
    );

    Aggregation::Ready(AggregationResult {
        periods,
        counts,
        unclassified,
        share,
        detail_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(entity: &str, period: &str, ratio: &str) -> LossRecord {
        LossRecord::new(entity, period, Some(ratio))
    }

    fn ready(agg: Aggregation) -> AggregationResult {
        match agg {
            Aggregation::Ready(r) => r,
            Aggregation::NoData => panic!("expected a result"),
        }
    }

    fn sample() -> Vec<LossRecord> {
        vec![
            rec("A", "current", "1.5"),
            rec("B", "current", "2.8"),
            rec("A", "current", "1.5"),
            rec("C", "prior", "6.3"),
        ]
    }

    #[test]
    fn end_to_end_example() {
        let result = ready(aggregate(&sample(), "current"));
        assert_eq!(result.periods, vec!["current", "prior"]);
        assert_eq!(result.count(Band::Below2, "current"), 1);
        assert_eq!(result.count(Band::From2To3, "current"), 1);
        assert_eq!(result.count(Band::From5To7, "prior"), 1);

        let nonzero: usize = result
            .counts
            .iter()
            .flat_map(|row| row.counts.iter())
            .filter(|c| **c > 0)
            .count();
        assert_eq!(nonzero, 3);

        assert_eq!(result.share.period_label, "current");
        assert_eq!(result.share.total, 2);
        let share_sum: usize = result.share.rows.iter().map(|r| r.count).sum();
        assert_eq!(share_sum, 2);
        assert_eq!(result.detail_rows.len(), 3);
    }

    #[test]
    fn empty_input_is_no_data() {
        assert_eq!(aggregate(&[], "current"), Aggregation::NoData);
    }

    #[test]
    fn missing_ratio_column_is_no_data() {
        let records = vec![
            LossRecord::new("A", "current", None),
            LossRecord::new("B", "current", None),
        ];
        assert_eq!(aggregate(&records, "current"), Aggregation::NoData);
    }

    #[test]
    fn whitespace_only_ratios_are_no_data() {
        let records = vec![
            LossRecord::new("A", "current", Some("   ")),
            LossRecord::new("B", "current", Some("")),
        ];
        assert_eq!(aggregate(&records, "current"), Aggregation::NoData);
    }

    #[test]
    fn all_bands_present_even_when_empty() {
        let result = ready(aggregate(&[rec("A", "current", "9")], "current"));
        let bands: Vec<Band> = result.counts.iter().map(|r| r.band).collect();
        assert_eq!(bands, Band::ALL.to_vec());
        assert_eq!(result.count(Band::From7, "current"), 1);
        assert_eq!(result.count(Band::Below2, "current"), 0);
        assert_eq!(result.count(Band::Below2, "nope"), 0);
    }

    #[test]
    fn rows_follow_band_order_regardless_of_input_order() {
        let records = vec![
            rec("X", "current", "8"),
            rec("Y", "current", "0.5"),
            rec("Z", "current", "4,4"),
        ];
        let result = ready(aggregate(&records, "current"));
        assert_eq!(result.counts[0].band, Band::Below2);
        assert_eq!(result.counts[5].band, Band::From7);
        let ordered: Vec<Band> = result
            .filter_detail(BandFilter::All)
            .iter()
            .map(|r| r.band)
            .collect();
        assert_eq!(ordered, vec![Band::Below2, Band::From4To5, Band::From7]);
    }

    #[test]
    fn dedup_keeps_first_seen() {
        let records = vec![rec("A", "current", "1.0"), rec("A", "current", "8.0")];
        let result = ready(aggregate(&records, "current"));
        assert_eq!(result.detail_rows.len(), 1);
        assert_eq!(result.detail_rows[0].band, Band::Below2);
        assert_eq!(result.count(Band::From7, "current"), 0);
    }

    #[test]
    fn same_entity_in_two_periods_counts_in_both() {
        let records = vec![rec("A", "current", "1.0"), rec("A", "prior", "3.0")];
        let result = ready(aggregate(&records, "current"));
        assert_eq!(result.count(Band::Below2, "current"), 1);
        assert_eq!(result.count(Band::From3To4, "prior"), 1);
    }

    #[test]
    fn malformed_ratio_kept_in_detail_but_not_counted() {
        let records = vec![
            rec("A", "current", "1.2"),
            rec("B", "current", "n/a"),
            LossRecord::new("C", "current", None),
        ];
        let result = ready(aggregate(&records, "current"));
        assert_eq!(result.period_total("current"), 1);
        assert_eq!(result.unclassified, vec![2]);
        assert_eq!(result.detail_rows.len(), 3);
        assert_eq!(result.share.total, 1);
        let unknown = result.filter_detail(BandFilter::Only(Band::Unknown));
        assert_eq!(unknown.len(), 2);
        assert_eq!(unknown[0].loss_ratio, None);
    }

    #[test]
    fn counts_are_conserved_per_period() {
        let records = vec![
            rec("A", "Tháng 03/2025", "1.5"),
            rec("B", "Tháng 03/2025", "2,0"),
            rec("C", "Tháng 03/2025", "3"),
            rec("C", "Tháng 03/2025", "3"),
            rec("D", "Tháng 03/2025", "x"),
            rec("A", "Cùng kỳ 03/2024", "7"),
            rec("E", "Cùng kỳ 03/2024", "5.5"),
        ];
        let result = ready(aggregate(&records, "Tháng 03/2025"));
        for (col, period) in result.periods.iter().enumerate() {
            let distinct: HashSet<&str> = records
                .iter()
                .filter(|r| &r.period_label == period)
                .map(|r| r.entity_id.as_str())
                .collect();
            assert_eq!(
                result.period_total(period) + result.unclassified[col],
                distinct.len()
            );
        }
    }

    #[test]
    fn share_falls_back_to_first_period() {
        let records = vec![rec("A", "Lũy kế 01-03/2025", "2.2"), rec("B", "Cùng kỳ", "1")];
        let result = ready(aggregate(&records, "current"));
        assert_eq!(result.share.period_label, "Lũy kế 01-03/2025");
        assert_eq!(result.share.total, 1);
        let pct: f64 = result.share.rows.iter().map(|r| r.share_pct).sum();
        assert!((pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let records = sample();
        assert_eq!(aggregate(&records, "current"), aggregate(&records, "current"));
    }

    #[test]
    fn filter_only_returns_matching_band() {
        let result = ready(aggregate(&sample(), "current"));
        let rows = result.filter_detail(BandFilter::Only(Band::From5To7));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_id, "C");
        assert!(result
            .filter_detail(BandFilter::Only(Band::From3To4))
            .is_empty());
        assert_eq!(result.filter_detail(BandFilter::All).len(), 3);
    }
}

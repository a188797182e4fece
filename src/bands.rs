//! Loss-ratio bands and the classifier that maps a ratio onto them.

use crate::error::ReportError;
use crate::util::parse_ratio;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One of six contiguous half-open loss-ratio ranges, or `Unknown` for
/// values that could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Band {
    #[serde(rename = "<2%")]
    Below2,
    #[serde(rename = ">=2 và <3%")]
    From2To3,
    #[serde(rename = ">=3 và <4%")]
    From3To4,
    #[serde(rename = ">=4 và <5%")]
    From4To5,
    #[serde(rename = ">=5 và <7%")]
    From5To7,
    #[serde(rename = ">=7%")]
    From7,
    #[serde(rename = "Không xác định")]
    Unknown,
}

impl Band {
    /// The six real bands in ascending severity.
    pub const ALL: [Band; 6] = [
        Band::Below2,
        Band::From2To3,
        Band::From3To4,
        Band::From4To5,
        Band::From5To7,
        Band::From7,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Band::Below2 => "<2%",
            Band::From2To3 => ">=2 và <3%",
            Band::From3To4 => ">=3 và <4%",
            Band::From4To5 => ">=4 và <5%",
            Band::From5To7 => ">=5 và <7%",
            Band::From7 => ">=7%",
            Band::Unknown => "Không xác định",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a ratio (in percent) onto its band. Each threshold belongs to the
/// band above it.
pub fn classify(loss_ratio: f64) -> Band {
    if loss_ratio.is_nan() {
        Band::Unknown
    } else if loss_ratio < 2.0 {
        Band::Below2
    } else if loss_ratio < 3.0 {
        Band::From2To3
    } else if loss_ratio < 4.0 {
        Band::From3To4
    } else if loss_ratio < 5.0 {
        Band::From4To5
    } else if loss_ratio < 7.0 {
        Band::From5To7
    } else {
        Band::From7
    }
}

/// Classify a raw cell. Missing or unparsable text yields `Band::Unknown`.
pub fn classify_str(raw: Option<&str>) -> Band {
    parse_ratio(raw).map(classify).unwrap_or(Band::Unknown)
}

/// The band selection used to narrow the detail table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandFilter {
    #[default]
    All,
    Only(Band),
}

impl BandFilter {
    pub fn matches(self, band: Band) -> bool {
        match self {
            BandFilter::All => true,
            BandFilter::Only(b) => b == band,
        }
    }
}

impl fmt::Display for BandFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandFilter::All => f.write_str("Tất cả"),
            BandFilter::Only(b) => b.fmt(f),
        }
    }
}

impl FromStr for BandFilter {
    type Err = ReportError;

    /// Accepts `all`/`0`/`Tất cả`, a 1-based band index, or a band label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty()
            || s == "0"
            || s.eq_ignore_ascii_case("all")
            || s.to_lowercase() == "tất cả"
        {
            return Ok(BandFilter::All);
        }
        if let Ok(idx) = s.parse::<usize>() {
            return idx
                .checked_sub(1)
                .and_then(|i| Band::ALL.get(i))
                .map(|b| BandFilter::Only(*b))
                .ok_or_else(|| {
                    ReportError::Config(format!(
                        "band index must be 0-{}, got {}",
                        Band::ALL.len(),
                        idx
                    ))
                });
        }
        Band::ALL
            .iter()
            .chain(std::iter::once(&Band::Unknown))
            .find(|b| b.label() == s)
            .map(|b| BandFilter::Only(*b))
            .ok_or_else(|| ReportError::Config(format!("unknown band filter: {}", s)))
    }
}

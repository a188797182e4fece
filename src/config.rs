// Command-line settings and reporting-period windows.
//
// The window only decides which label each loaded sheet is tagged with;
// aggregation itself never looks at dates.
use crate::error::{ReportError, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;

/// Loss-ratio band report for transformer/feeder spreadsheets
#[derive(Parser, Debug, Clone)]
#[command(name = "loss_report", version)]
pub struct Settings {
    /// CSV export for the reporting period
    #[arg(long, env = "LOSS_REPORT_CURRENT")]
    pub current: PathBuf,

    /// CSV export for the same period last year
    #[arg(long, env = "LOSS_REPORT_COMPARE")]
    pub compare: Option<PathBuf>,

    /// Reporting month as YYYY-MM (defaults to this month)
    #[arg(long)]
    pub month: Option<String>,

    /// First month of a cumulative range ending at --month
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub from_month: Option<u32>,

    /// Extra accepted header for the entity column (repeatable)
    #[arg(long)]
    pub entity_column: Vec<String>,

    /// Extra accepted header for the loss-ratio column (repeatable)
    #[arg(long)]
    pub ratio_column: Vec<String>,

    /// Directory the CSV/JSON outputs are written to
    #[arg(long, default_value = ".", env = "LOSS_REPORT_OUT_DIR")]
    pub out_dir: PathBuf,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,
}

impl Settings {
    /// Resolve `--month`/`--from-month` into a window, defaulting to the
    /// current local month.
    pub fn window(&self) -> Result<PeriodWindow> {
        let (year, month) = match &self.month {
            Some(m) => parse_year_month(m)?,
            None => {
                let today = Local::now().date_naive();
                (today.year(), today.month())
            }
        };
        match self.from_month {
            Some(from) => PeriodWindow::cumulative(year, from, month),
            None => PeriodWindow::month(year, month),
        }
    }
}

/// A reporting window: a single month or a contiguous month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodWindow {
    Month { year: i32, month: u32 },
    Cumulative { year: i32, from_month: u32, to_month: u32 },
}

impl PeriodWindow {
    pub fn month(year: i32, month: u32) -> Result<Self> {
        check_month(month)?;
        Ok(PeriodWindow::Month { year, month })
    }

    pub fn cumulative(year: i32, from_month: u32, to_month: u32) -> Result<Self> {
        check_month(from_month)?;
        check_month(to_month)?;
        if from_month > to_month {
            return Err(ReportError::Config(format!(
                "cumulative range {}-{} runs backwards",
                from_month, to_month
            )));
        }
        if from_month == to_month {
            return Ok(PeriodWindow::Month { year, month: to_month });
        }
        Ok(PeriodWindow::Cumulative {
            year,
            from_month,
            to_month,
        })
    }

    /// The same months one year earlier, for year-over-year comparison.
    pub fn same_period_last_year(self) -> Self {
        match self {
            PeriodWindow::Month { year, month } => PeriodWindow::Month {
                year: year - 1,
                month,
            },
            PeriodWindow::Cumulative {
                year,
                from_month,
                to_month,
            } => PeriodWindow::Cumulative {
                year: year - 1,
                from_month,
                to_month,
            },
        }
    }

    fn span(self) -> String {
        match self {
            PeriodWindow::Month { year, month } => format!("{:02}/{}", month, year),
            PeriodWindow::Cumulative {
                year,
                from_month,
                to_month,
            } => format!("{:02}-{:02}/{}", from_month, to_month, year),
        }
    }

    /// Period label for sheets loaded as this window.
    pub fn label(self) -> String {
        match self {
            PeriodWindow::Month { .. } => format!("Tháng {}", self.span()),
            PeriodWindow::Cumulative { .. } => format!("Lũy kế {}", self.span()),
        }
    }

    /// Label for the comparison sheet: this window's months, one year back.
    pub fn comparison_label(self) -> String {
        format!("Cùng kỳ {}", self.same_period_last_year().span())
    }
}

fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ReportError::Config(format!("month must be 1-12, got {}", month)))
    }
}

/// Parse `YYYY-MM` into `(year, month)`.
pub fn parse_year_month(s: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| ReportError::Config(format!("expected YYYY-MM, got '{}'", s)))?;
    Ok((date.year(), date.month()))
}

// Entry point and interactive menu.
//
// - Option [1] (re)loads the current and comparison sheets.
// - Option [2] aggregates them into loss bands, previews the tables and
//   writes the CSV/JSON outputs.
// - After generating reports, the user can go back to the menu or exit.
mod bands;
mod config;
mod error;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use bands::BandFilter;
use clap::Parser;
use config::{PeriodWindow, Settings};
use loader::{ColumnMapping, Source, SourceCache, SourceOutcome};
use reports::Aggregation;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use types::{LossRecord, ReportSummary};

/// Everything one run of the menu needs, passed explicitly to each handler.
struct Session {
    sources: Vec<Source>,
    mapping: ColumnMapping,
    cache: SourceCache,
    current_label: String,
    out_dir: PathBuf,
    records: Option<Vec<LossRecord>>,
}

impl Session {
    fn new(settings: &Settings, window: PeriodWindow) -> Self {
        let current_label = window.label();
        let mut sources = vec![Source::new(&settings.current, current_label.clone())];
        if let Some(compare) = &settings.compare {
            sources.push(Source::new(compare, window.comparison_label()));
        }
        Self {
            sources,
            mapping: ColumnMapping::default()
                .with_extra(&settings.entity_column, &settings.ratio_column),
            cache: SourceCache::new(),
            current_label,
            out_dir: settings.out_dir.clone(),
            records: None,
        }
    }
}

fn setup_logging(log_level: &str) {
    let normalised = match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(normalised));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

/// Print `prompt` and read one trimmed line. `None` once input is closed.
fn read_line<R: BufRead>(input: &mut R, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt_back_to_menu<R: BufRead>(input: &mut R) -> bool {
    loop {
        let Some(answer) = read_line(input, "Back to Report Selection (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn prompt_band_filter<R: BufRead>(input: &mut R) -> BandFilter {
    println!("Band filter for the detail table:");
    println!("[0] Tất cả");
    for (i, band) in bands::Band::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, band);
    }
    loop {
        let Some(choice) = read_line(input, "Enter choice: ") else {
            return BandFilter::All;
        };
        match choice.parse::<BandFilter>() {
            Ok(filter) => return filter,
            Err(e) => println!("{}", e),
        }
    }
}

/// Handle option [1]: drop cached sheets and read every source again.
fn handle_load(session: &mut Session) {
    session.cache.invalidate();
    let outcomes = loader::load_sources(&session.sources, &session.mapping, &mut session.cache);
    for (source, outcome) in &outcomes {
        match outcome {
            SourceOutcome::Loaded { report, .. } => {
                println!(
                    "{} [{}]: {} of {} rows loaded, {} skipped",
                    source.path.display(),
                    source.label,
                    util::format_int(report.loaded_rows),
                    util::format_int(report.total_rows),
                    util::format_int(report.parse_errors)
                );
                if !report.has_ratio_column {
                    println!("Warning: no loss-ratio column in {}", source.path.display());
                }
            }
            SourceOutcome::Empty(report) => println!(
                "{} [{}]: no usable rows ({} skipped)",
                source.path.display(),
                source.label,
                util::format_int(report.parse_errors)
            ),
            SourceOutcome::Failed(e) => eprintln!(
                "{} [{}]: failed to load: {}",
                source.path.display(),
                source.label,
                e
            ),
        }
    }
    println!();
    if session.cache.is_empty() {
        println!("Warning: no source could be read.\n");
    }
    info!(cached = session.cache.len(), "sources loaded");
    session.records = Some(loader::merge_records(&outcomes));
}

/// Handle option [2]: aggregate, preview and export.
fn handle_generate_reports<R: BufRead>(session: &Session, input: &mut R) {
    let Some(records) = &session.records else {
        println!("Error: No data loaded. Please load the files first (option 1).\n");
        return;
    };
    let filter = prompt_band_filter(input);

    let result = match reports::aggregate(records, &session.current_label) {
        Aggregation::Ready(result) => result,
        Aggregation::NoData => {
            println!("No data: the loaded sheets carry no loss-ratio values.\n");
            return;
        }
    };

    println!("\nReport 1: Entities per loss band and period\n");
    output::preview_pivot(&result);
    for period in &result.periods {
        println!("{}: {} entities", period, util::format_int(result.period_total(period)));
    }
    println!();

    println!(
        "Report 2: Band share for {} ({} entities)\n",
        result.share.period_label,
        util::format_int(result.share.total)
    );
    output::preview_table_rows(&result.share.rows, result.share.rows.len());

    let detail = result.filter_detail(filter);
    println!(
        "Report 3: Detail ({}, {} rows)\n",
        filter,
        util::format_int(detail.len())
    );
    output::preview_table_rows(&detail, 10);

    let summary = ReportSummary {
        periods: &result.periods,
        counts: &result.counts,
        unclassified: &result.unclassified,
        share: &result.share,
        filter: filter.to_string(),
        detail_rows: detail.len(),
    };
    let dir = &session.out_dir;
    let writes = [
        (
            "report1_band_counts.csv",
            output::write_pivot_csv(&dir.join("report1_band_counts.csv"), &result),
        ),
        (
            "report2_band_share.csv",
            output::write_csv(&dir.join("report2_band_share.csv"), &result.share.rows),
        ),
        (
            "report3_detail.csv",
            output::write_csv(&dir.join("report3_detail.csv"), &detail),
        ),
        (
            "summary.json",
            output::write_json(&dir.join("summary.json"), &summary),
        ),
    ];
    for (name, outcome) in writes {
        match outcome {
            Ok(()) => info!(file = name, "report written"),
            Err(e) => error!(file = name, error = %e, "write failed"),
        }
    }
    println!("(Full tables exported to {})\n", dir.display());
}

fn main() {
    let settings = Settings::parse();
    setup_logging(&settings.log_level);
    let window = match settings.window() {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let mut session = Session::new(&settings, window);
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        println!("Loss Band Report - {}", session.current_label);
        println!("[1] Load the files");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_line(&mut input, "Enter choice: ") else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session),
            "2" => {
                println!();
                handle_generate_reports(&session, &mut input);
                if !prompt_back_to_menu(&mut input) {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_line_returns_none_on_closed_input() {
        let mut input = Cursor::new("");
        assert_eq!(read_line(&mut input, "Enter choice: "), None);
    }

    #[test]
    fn read_line_trims_and_then_reports_end() {
        let mut input = Cursor::new(" 2 \n");
        assert_eq!(read_line(&mut input, "Enter choice: "), Some("2".to_string()));
        assert_eq!(read_line(&mut input, "Enter choice: "), None);
    }

    #[test]
    fn back_to_menu_stops_on_closed_input() {
        assert!(!prompt_back_to_menu(&mut Cursor::new("")));
        assert!(!prompt_back_to_menu(&mut Cursor::new("maybe\n")));
        assert!(prompt_back_to_menu(&mut Cursor::new("x\ny\n")));
    }

    #[test]
    fn band_filter_defaults_to_all_on_closed_input() {
        assert_eq!(prompt_band_filter(&mut Cursor::new("")), BandFilter::All);
        assert_eq!(
            prompt_band_filter(&mut Cursor::new("9\n6\n")),
            BandFilter::Only(bands::Band::From7)
        );
    }
}

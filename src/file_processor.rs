use super::cli_utils;
use super::comparable_finder::ComparableFinder;
use super::dataset_loader::Dataset;
use super::row_flattener::RowFlattener;

use csv;
use std::io;
use std::time;

use log::{info, warn};

use failure::Fail;

#[derive(Debug, Default, PartialEq)]
pub struct ProcessStats {
    pub total_rows: u32,
    pub written_rows: u32,
    pub skipped_rows: u32,
    pub rows_without_comparables: u32,
}

#[derive(Debug, Fail)]
pub enum ReportError {
    #[fail(display = "I/O error: {}", _0)]
    Io(io::Error),
    #[fail(display = "Csv error: {}", _0)]
    Csv(csv::Error),
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> ReportError {
        ReportError::Csv(err)
    }
}

impl From<io::Error> for ReportError {
    fn from(err: io::Error) -> ReportError {
        ReportError::Io(err)
    }
}

/// Writes one flattened row per subject, in dataset order.
///
/// A subject that cannot be matched is logged with its row index and left out
/// of the report; writer failures abort the run.
pub fn comparables_report<W: io::Write>(
    dataset: &Dataset,
    finder: &ComparableFinder,
    output_file: W,
    delimiter: u8,
    quiet: bool,
) -> Result<ProcessStats, ReportError> {
    let progress_bar =
        cli_utils::create_progress_bar(quiet, "Matching...", Some(dataset.len() as u64));

    let flattener = RowFlattener::new(dataset);

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(output_file);
    csv_writer.write_record(flattener.header())?;

    let mut stats = ProcessStats::default();
    let start_instant = time::Instant::now();

    for (row_index, subject) in dataset.records.iter().enumerate() {
        stats.total_rows += 1;
        progress_bar.inc(1);

        let comparables = match finder.find_comparables(subject, &dataset.records) {
            Ok(comparables) => comparables,
            Err(e) => {
                warn!("Skipping row {}: {}", row_index, e);
                stats.skipped_rows += 1;
                continue;
            }
        };

        if comparables.is_empty() {
            stats.rows_without_comparables += 1;
        }

        let row = flattener.flatten(subject, &comparables);
        csv_writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or_default()))?;
        stats.written_rows += 1;
    }

    csv_writer.flush()?;
    progress_bar.finish();

    let elapsed_secs = start_instant.elapsed().as_millis() as f32 / 1000.0f32;
    info!(
        "Matched {} properties in {} seconds ({} written, {} skipped, {} without comparables)",
        stats.total_rows, elapsed_secs, stats.written_rows, stats.skipped_rows,
        stats.rows_without_comparables
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparable_finder::{ColumnLayout, MatchRules};
    use crate::dataset_loader::read_dataset;

    const HOTELS_CSV: &str = include_str!("comparable_finder/test_resources/hotels.csv");

    fn run_report() -> (ProcessStats, Vec<csv::StringRecord>) {
        let dataset = read_dataset(HOTELS_CSV.as_bytes(), b',', ColumnLayout::hotel()).unwrap();
        let finder = ComparableFinder::new(MatchRules::hotel());
        let mut output = Vec::new();

        let stats = comparables_report(&dataset, &finder, &mut output, b',', true).unwrap();

        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(output.as_slice())
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (stats, rows)
    }

    #[test]
    fn it_should_skip_subjects_that_cannot_be_matched() {
        let (stats, rows) = run_report();

        assert_eq!(
            stats,
            ProcessStats {
                total_rows: 8,
                written_rows: 7,
                skipped_rows: 1,
                rows_without_comparables: 2,
            }
        );
        assert_eq!(rows.len(), 1 + 7);
        assert!(rows.iter().all(|r| &r[1] != "Mystery Motel"));
    }

    #[test]
    fn it_should_write_ranked_comparables_for_the_first_subject() {
        let (_, rows) = run_report();

        let grand_plaza = &rows[1];
        assert_eq!(&grand_plaza[1], "Grand Plaza");
        assert_eq!(&grand_plaza[11], "Harbor View");
        assert_eq!(&grand_plaza[20], "Budget Stay");
        assert_eq!(&grand_plaza[29], "Riverside Inn");
        assert_eq!(&grand_plaza[38], "");
    }

    #[test]
    fn it_should_write_rows_of_equal_width() {
        let (_, rows) = run_report();

        assert!(rows.iter().all(|r| r.len() == 10 + 5 * 9));
    }
}

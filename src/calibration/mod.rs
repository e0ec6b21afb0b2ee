//! # Calibration Alert Engine
//!
//! Splits a worksheet holding several stacked inventory tables into blocks,
//! rebuilds each block as a named-column table and sorts its instruments into
//! overdue and upcoming calibrations.
//!
//! ## Pipeline
//!
//! 1. [`segment`] finds header rows and recovers a category title for each block
//! 2. [`build_table`] turns a block into fields and records
//! 3. [`normalize_table`] canonicalizes field names and resolves the due-date column
//! 4. [`classify`] buckets records by days until their due date
//! 5. [`ReportTable::append`] gathers every block's buckets into the [`Report`]
//!
//! Per-block problems (no due-date column, no identification values, unparseable
//! dates) never stop the run; only a sheet without any header row is an error.
use crate::error::AlertError;
use crate::spreadsheet::RawGrid;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub mod classify;
pub mod normalize;
pub mod report;
pub mod rules;
pub mod segment;
pub mod table;

pub use classify::classify;
pub use classify::Bucket;
pub use classify::Classification;
pub use classify::ClassifiedRecord;
pub use normalize::assign_category;
pub use normalize::normalize_column_name;
pub use normalize::normalize_table;
pub use normalize::parse_due_date;
pub use normalize::DUE_DATE_FIELD;
pub use report::Report;
pub use report::ReportRow;
pub use report::ReportTable;
pub use report::CATEGORY_FIELD;
pub use rules::Category;
pub use rules::CategoryRule;
pub use rules::MatchRules;
pub use segment::segment;
pub use segment::Block;
pub use table::build_table;
pub use table::Record;
pub use table::Table;

/// Default width of the upcoming window, in days.
pub const DEFAULT_THRESHOLD_DAYS: i64 = 15;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("No header row found in the sheet")]
    NoHeaderFound,
}

/// Inputs of one evaluation besides the grid and the date.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertSettings {
    /// Last day (inclusive) of the upcoming window
    pub threshold_days: i64,
    pub rules: MatchRules,
}

impl Default for AlertSettings {
    fn default() -> Self {
        AlertSettings {
            threshold_days: DEFAULT_THRESHOLD_DAYS,
            rules: MatchRules::default(),
        }
    }
}

/// Runs the whole engine over a grid.
///
/// # Arguments
///
/// * `grid` - Decoded worksheet
/// * `settings` - Threshold and matching rules
/// * `today` - Reference date for day differences
///
/// # Returns
///
/// * `Result<Report, AlertError>` - Overdue and upcoming rows with every block column,
///   or `NoHeaderFound` when the sheet has no header row
pub fn evaluate(grid: &RawGrid, settings: &AlertSettings, today: NaiveDate) -> Result<Report, AlertError> {
    let rules = &settings.rules;
    let blocks = segment(grid, rules)?;
    info!(blocks = blocks.len(), rows = grid.len(), "sheet segmented");

    let mut report = Report::new(settings.threshold_days);
    for (index, block) in blocks.iter().enumerate() {
        // Skipped blocks still take their position in the fallback order
        let category = assign_category(block.category_label.as_deref(), index, rules);
        let mut table = build_table(grid, block.header_row, block.end);
        let due_index = normalize_table(&mut table, rules);

        if !normalize::has_identification_data(&table, rules) {
            debug!(header_row = block.header_row, %category, "block has no identification values, skipped");
            continue;
        }
        if due_index.is_none() {
            warn!(header_row = block.header_row, %category, fields = ?table.fields, "no due-date column in block");
            continue;
        }

        let classification = classify(&table, due_index, today, settings.threshold_days);
        info!(
            header_row = block.header_row,
            %category,
            label = block.category_label.as_deref().unwrap_or("-"),
            records = table.records.len(),
            overdue = classification.overdue.len(),
            upcoming = classification.upcoming.len(),
            "block classified"
        );
        report.overdue.append(&table.fields, &classification.overdue, category);
        report.upcoming.append(&table.fields, &classification.upcoming, category);
    }

    Ok(report)
}

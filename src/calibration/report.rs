use crate::calibration::classify::ClassifiedRecord;
use crate::calibration::normalize::DUE_DATE_FIELD;
use crate::calibration::rules::Category;
use crate::calibration::rules::MatchRules;
use crate::spreadsheet::Cell;

/// Column under which each report row shows its category.
pub const CATEGORY_FIELD: &str = "TIPO";

/// One alerted instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub category: Category,
    pub days_remaining: Option<i64>,
    /// Cells aligned with the owning table's fields
    pub cells: Vec<Cell>,
}

/// Rows of one bucket gathered across blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportTable {
    /// Union of block fields in first-seen order
    pub fields: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends the classified records of one block.
    ///
    /// Block fields missing from the table are added at the end and earlier rows get
    /// empty cells for them. Within a block only the first of several equally named
    /// fields is kept.
    pub fn append(&mut self, fields: &[String], records: &[ClassifiedRecord], category: Category) {
        if records.is_empty() {
            return;
        }

        let mut mapping: Vec<Option<usize>> = Vec::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if fields[..position].contains(field) {
                mapping.push(None);
                continue;
            }
            let index = match self.fields.iter().position(|existing| existing == field) {
                Some(index) => index,
                None => {
                    self.fields.push(field.clone());
                    self.fields.len() - 1
                }
            };
            mapping.push(Some(index));
        }

        let width = self.fields.len();
        for row in self.rows.iter_mut() {
            row.cells.resize(width, Cell::Empty);
        }

        for classified in records {
            let mut cells = vec![Cell::Empty; width];
            for (source, target) in mapping.iter().enumerate() {
                if let (Some(target), Some(cell)) = (target, classified.record.get(source)) {
                    cells[*target] = cell.clone();
                }
            }
            self.rows.push(ReportRow {
                category,
                days_remaining: classified.days_remaining,
                cells,
            });
        }
    }

    /// Column positions shown in the report.
    ///
    /// Each display target picks the first field containing it; repeats are dropped and
    /// the due-date field is added when no target selected it.
    pub fn display_columns(&self, rules: &MatchRules) -> Vec<usize> {
        let mut columns: Vec<usize> = Vec::new();
        for target in rules.display_targets() {
            if let Some(index) = self.fields.iter().position(|field| field.contains(&target)) {
                if !columns.contains(&index) {
                    columns.push(index);
                }
            }
        }
        if let Some(index) = self.fields.iter().position(|field| field == DUE_DATE_FIELD) {
            if !columns.contains(&index) {
                columns.push(index);
            }
        }
        columns
    }

    /// Narrows the table to its display columns.
    pub fn project(&self, rules: &MatchRules) -> ReportTable {
        let columns = self.display_columns(rules);
        ReportTable {
            fields: columns.iter().map(|&index| self.fields[index].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| ReportRow {
                    category: row.category,
                    days_remaining: row.days_remaining,
                    cells: columns
                        .iter()
                        .map(|&index| row.cells.get(index).cloned().unwrap_or_default())
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Overdue and upcoming instruments of one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub overdue: ReportTable,
    pub upcoming: ReportTable,
    pub threshold_days: i64,
}

impl Report {
    pub fn new(threshold_days: i64) -> Self {
        Report {
            threshold_days,
            ..Report::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.upcoming.is_empty()
    }

    /// Both buckets narrowed to their display columns.
    pub fn project(&self, rules: &MatchRules) -> Report {
        Report {
            overdue: self.overdue.project(rules),
            upcoming: self.upcoming.project(rules),
            threshold_days: self.threshold_days,
        }
    }
}

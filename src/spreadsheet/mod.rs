//! # Spreadsheet Grid Module
//!
//! Turns workbook bytes into a [`RawGrid`]: a rectangular, row-major block of
//! tagged [`Cell`] values anchored at A1. Nothing above this layer looks at
//! file formats, styles or shared string tables.
use crate::error::AlertError;
use glob::Pattern;
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod xlsx;

pub use cell::Cell;
pub use xlsx::XlsxGridProvider;

/// Errors raised while decoding a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required workbook part is absent from the archive
    #[error("Missing workbook part '{0}'")]
    MissingPart(String),

    /// The workbook declares no worksheets
    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    /// No worksheet name matches the requested pattern
    #[error("No worksheet matches '{0}'")]
    SheetNotFound(String),

    /// Used cells span more cells than a grid may hold
    #[error("Worksheet spans {rows} rows by {columns} columns, more than {limit} cells")]
    GridTooLarge { rows: usize, columns: usize, limit: usize },

    /// A cell value that contradicts its declared type
    #[error("Invalid cell value '{value}' at {reference}")]
    InvalidCellValue { reference: String, value: String },
}

/// Decodes raw spreadsheet bytes into a grid.
pub trait GridProvider {
    /// Loads one worksheet: the first matching `sheet`, or the first sheet when no pattern is given.
    fn load(&self, bytes: Vec<u8>, sheet: Option<&Pattern>) -> Result<RawGrid, AlertError>;
}

/// Row-major grid of cells with every row padded to the same width.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl RawGrid {
    /// Builds a grid, padding short rows with empty cells.
    pub fn new(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, Cell::Empty);
        }
        RawGrid { rows, width }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns shared by every row.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Concatenates the display text of a row, space separated and upper-cased.
    /// Out-of-range rows yield an empty string.
    pub fn row_text(&self, index: usize) -> String {
        self.row(index)
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| cell.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_uppercase()
            })
            .unwrap_or_default()
    }
}

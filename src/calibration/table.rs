use crate::spreadsheet::Cell;
use crate::spreadsheet::RawGrid;

/// One data row of a block, tied back to its grid row.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Source row index in the grid
    pub row: usize,
    /// Cells in header order
    pub cells: Vec<Cell>,
}

impl Record {
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }
}

/// Named-column view of a block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Header titles, duplicates kept in position
    pub fields: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    /// Position of the first field with exactly this name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }
}

/// Builds the table of one block: field names from `header_row`, records from the rows
/// after it up to `end` (exclusive). Rows with every cell empty are dropped.
pub fn build_table(grid: &RawGrid, header_row: usize, end: usize) -> Table {
    let fields = grid
        .row(header_row)
        .map(|cells| cells.iter().map(|cell| cell.to_string()).collect())
        .unwrap_or_default();

    let end = end.min(grid.len());
    let records = (header_row + 1..end)
        .filter_map(|row| {
            let cells = grid.row(row)?;
            if cells.iter().all(Cell::is_empty) {
                return None;
            }
            Some(Record {
                row,
                cells: cells.to_vec(),
            })
        })
        .collect();

    Table { fields, records }
}

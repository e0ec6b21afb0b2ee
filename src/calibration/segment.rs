use crate::calibration::rules::MatchRules;
use crate::calibration::CalibrationError;
use crate::spreadsheet::RawGrid;

/// Contiguous row range of the grid holding one logical table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Row holding the column titles
    pub header_row: usize,
    /// First row of the block, always the header row
    pub start: usize,
    /// Next block's header row or the grid length
    pub end: usize,
    /// Compacted category title found above the header row
    pub category_label: Option<String>,
}

/// Rows whose upper-cased text contains a header keyword, in grid order.
pub fn header_candidates(grid: &RawGrid, rules: &MatchRules) -> Vec<usize> {
    (0..grid.len())
        .filter(|&row| rules.is_header(&grid.row_text(row)))
        .collect()
}

/// Partitions the grid into blocks starting at every header row.
///
/// Rows above the first header row belong to no block.
///
/// # Arguments
///
/// * `grid` - Decoded worksheet
/// * `rules` - Header keywords and category tokens
///
/// # Returns
///
/// * `Result<Vec<Block>, CalibrationError>` - Non-empty blocks in header order, or
///   `NoHeaderFound` when no row looks like a header
pub fn segment(grid: &RawGrid, rules: &MatchRules) -> Result<Vec<Block>, CalibrationError> {
    let candidates = header_candidates(grid, rules);
    if candidates.is_empty() {
        return Err(CalibrationError::NoHeaderFound);
    }

    let blocks = candidates
        .iter()
        .enumerate()
        .map(|(position, &header_row)| Block {
            header_row,
            start: header_row,
            end: candidates.get(position + 1).copied().unwrap_or(grid.len()),
            category_label: recover_category_label(grid, header_row, rules),
        })
        .collect();
    Ok(blocks)
}

/// Looks for a category title right above the header row, then in the rows above it.
fn recover_category_label(grid: &RawGrid, header_row: usize, rules: &MatchRules) -> Option<String> {
    let above = header_row.checked_sub(1)?;
    rules
        .find_category_label(&grid.row_text(above))
        .or_else(|| {
            (header_row.saturating_sub(rules.category_scan_depth)..header_row)
                .find_map(|row| rules.find_category_label(&grid.row_text(row)))
        })
}

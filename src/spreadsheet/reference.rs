use regex::Regex;
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").expect("Hardcode regex pattern"));

/// Converts column letters to a 0-based column index (A = 0, Z = 25, AA = 26).
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    letters
        .to_ascii_uppercase()
        .bytes()
        .map(|letter| (letter - b'A') as usize + 1)
        .reduce(|index, digit| index * 26 + digit)
        .map(|col| col - 1)
}

/// Converts a 1-based row number to a 0-based row index.
pub(crate) fn row_to_index(number: &str) -> Option<usize> {
    number
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(|row| row - 1)
}

/// Converts an Excel-style reference such as "B12" to 0-based (row, col).
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE.captures(reference)?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = row_to_index(captures.get(2)?.as_str())?;
    Some((row, col))
}

use crate::calibration::rules::Category;
use crate::calibration::rules::MatchRules;
use crate::calibration::table::Table;
use crate::spreadsheet::Cell;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use unicode_normalization::UnicodeNormalization;

/// Canonical name given to the resolved due-date column.
pub const DUE_DATE_FIELD: &str = "FECHA_PROXIMA";

/// Text date formats accepted in the due-date column, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Canonical spelling of a column title.
///
/// Accents are decomposed and dropped, letters upper-cased, double quotes removed,
/// and every whitespace run (newlines included) collapsed to one space.
/// Applying it to its own output changes nothing.
pub fn normalize_column_name(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .filter(|character| *character != '"')
        .map(|character| character.to_ascii_uppercase())
        .collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes every field name and renames the first due-date column.
///
/// # Arguments
///
/// * `table` - Table with raw header titles
/// * `rules` - Due-date alias list
///
/// # Returns
///
/// * `Option<usize>` - Position of the canonical due-date field, `None` when no alias matched
pub fn normalize_table(table: &mut Table, rules: &MatchRules) -> Option<usize> {
    for field in table.fields.iter_mut() {
        *field = normalize_column_name(field);
    }
    let position = table
        .fields
        .iter()
        .position(|field| rules.is_due_date_field(field))?;
    table.fields[position] = DUE_DATE_FIELD.to_owned();
    Some(position)
}

/// Reads a due date out of a cell; anything that is not a recognizable date is `None`.
pub fn parse_due_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(date) => Some(*date),
        Cell::Text(text) => parse_date_text(text.trim()),
        Cell::Number(_) | Cell::Empty => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// Category of a block: the recovered title label when it maps to a category,
/// otherwise the positional fallback.
pub fn assign_category(label: Option<&str>, index: usize, rules: &MatchRules) -> Category {
    label
        .and_then(|label| rules.category_of(label))
        .unwrap_or_else(|| Category::from_position(index))
}

/// Whether the first identification column holds at least one non-blank value.
/// A table without an identification column has no data.
pub fn has_identification_data(table: &Table, rules: &MatchRules) -> bool {
    match table
        .fields
        .iter()
        .position(|field| rules.is_identification_field(field))
    {
        Some(index) => table
            .records
            .iter()
            .any(|record| record.get(index).map(|cell| !cell.is_blank()).unwrap_or(false)),
        None => false,
    }
}

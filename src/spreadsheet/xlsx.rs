use crate::error::AlertError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::serial_to_date;
use crate::spreadsheet::excel::NumberStyle;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::GridProvider;
use crate::spreadsheet::RawGrid;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use glob::Pattern;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use tracing::debug;
use zip::ZipArchive;

// XML local names used by the SpreadsheetML parts
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts"; // Custom number formats container
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt"; // Individual custom number format
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs"; // Cell format records container
const TAG_FORMAT_INDEX: &[u8] = b"xf"; // Individual cell format record
const TAG_SHARED_STRING_ITEM: &[u8] = b"si"; // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh"; // Phonetic reading, not part of the value
const TAG_TEXT: &[u8] = b"t"; // Text run
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const TAG_SHEET: &[u8] = b"sheet";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

/// Upper bound on rows × columns of a decoded grid
const MAX_GRID_CELLS: usize = 5_000_000;

/// Cell kind declared by the `t` attribute, refined by the cell style.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
enum CellKind {
    #[default]
    Skipped,
    Number,
    DateSerial,
    IsoDate,
    Boolean,
    InlineString,
    SharedString,
    Error,
}

/// Grid provider for Excel 2007+ workbooks (.xlsx, .xlsm).
#[derive(Clone, Copy, Debug, Default)]
pub struct XlsxGridProvider;

impl GridProvider for XlsxGridProvider {
    fn load(&self, bytes: Vec<u8>, sheet: Option<&Pattern>) -> Result<RawGrid, AlertError> {
        let mut workbook = XlsxWorkbook::open(bytes)?;
        let (name, path) = workbook.select_sheet(sheet)?;
        debug!(sheet = %name, part = %path, "reading worksheet");
        workbook.read_grid(&path)
    }
}

/// An opened workbook with its styles already resolved
struct XlsxWorkbook {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    /// Number style per cell format record, indexed by the `s` attribute
    number_styles: Vec<NumberStyle>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    is_1904: bool,
}

impl XlsxWorkbook {
    fn open(bytes: Vec<u8>) -> Result<XlsxWorkbook, AlertError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook)?
        }
        let number_styles = load_number_styles(&mut zip)?;
        Ok(XlsxWorkbook {
            zip,
            number_styles,
            sheets,
            is_1904,
        })
    }

    fn select_sheet(&self, pattern: Option<&Pattern>) -> Result<(String, String), AlertError> {
        let selected = match pattern {
            Some(pattern) => self.sheets.iter().find(|(name, _)| pattern.matches(name)),
            None => self.sheets.first(),
        };
        match selected {
            Some(sheet) => Ok(sheet.clone()),
            None => Err(SpreadsheetError::SheetNotFound(
                pattern.map(|pattern| pattern.as_str().to_owned()).unwrap_or_default(),
            )
            .into()),
        }
    }

    /// Reads one worksheet into a grid anchored at A1
    ///
    /// # Arguments
    /// * `zip_path` - Path of the worksheet part inside the archive
    ///
    /// # Returns
    /// The decoded grid; rows and columns before the first used cell are kept as empty cells
    fn read_grid(&mut self, zip_path: &str) -> Result<RawGrid, AlertError> {
        let shared_strings = load_shared_strings(&mut self.zip)?;
        let is_1904 = self.is_1904;
        let number_styles = &self.number_styles;
        let mut reader = self
            .zip
            .xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::MissingPart(zip_path.to_owned()))?;

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        let mut next_row = 0usize;
        let mut next_col = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellKind::default();
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                row = match event.attribute("r")? {
                    Some(number) => number.parse::<usize>()?.saturating_sub(1),
                    None => next_row,
                };
                next_col = 0;
            }
            Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
                next_row = row + 1;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                (row, col) = event
                    .attribute("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row, next_col));
                next_col = col + 1;
                kind = match event.attribute("t")?.as_deref() {
                    Some("s") => CellKind::SharedString,
                    Some("inlineStr") | Some("str") => CellKind::InlineString,
                    Some("d") => CellKind::IsoDate,
                    Some("b") => CellKind::Boolean,
                    Some("e") => CellKind::Error,
                    _ => CellKind::Number,
                };
                if kind == CellKind::Number {
                    if let Some(format_id) = event.attribute("s")?.filter(|id| !id.is_empty()) {
                        let style = number_styles.get(format_id.parse::<usize>()?).copied();
                        if style == Some(NumberStyle::Date) {
                            kind = CellKind::DateSerial;
                        }
                    }
                }
                value.clear();
            }
            Event::Start(event) if kind != CellKind::Skipped && event.local_name().as_ref() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind != CellKind::Skipped && event.local_name().as_ref() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                if kind != CellKind::Skipped && !value.is_empty() {
                    let cell = decode_cell(kind, &value, &shared_strings, is_1904)
                        .ok_or_else(|| SpreadsheetError::InvalidCellValue {
                            reference: format!("R{}C{}", row + 1, col + 1),
                            value: value.to_owned(),
                        })?;
                    place(&mut rows, row, col, cell);
                }
                kind = CellKind::Skipped;
                value.clear();
            }
        });

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.len().saturating_mul(columns) > MAX_GRID_CELLS {
            return Err(SpreadsheetError::GridTooLarge {
                rows: rows.len(),
                columns,
                limit: MAX_GRID_CELLS,
            }
            .into());
        }
        Ok(RawGrid::new(rows))
    }
}

/// Converts a raw cell value according to its kind.
/// Returns `None` only for shared string indexes outside the table.
fn decode_cell(kind: CellKind, value: &str, shared_strings: &[String], is_1904: bool) -> Option<Cell> {
    let cell = match kind {
        CellKind::Skipped | CellKind::Error => Cell::Empty,
        CellKind::SharedString => {
            let index = value.trim().parse::<usize>().ok()?;
            Cell::Text(shared_strings.get(index)?.to_owned())
        }
        CellKind::InlineString => Cell::Text(value.to_owned()),
        CellKind::Boolean => Cell::Text(if value == "1" { "TRUE" } else { "FALSE" }.to_owned()),
        CellKind::IsoDate => value
            .get(..10)
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(value.to_owned())),
        CellKind::Number => value
            .parse::<f64>()
            .map(Cell::Number)
            .unwrap_or_else(|_| Cell::Text(value.to_owned())),
        CellKind::DateSerial => match value.parse::<f64>() {
            Ok(serial) => serial_to_date(serial, is_1904)
                .map(Cell::Date)
                .unwrap_or(Cell::Number(serial)),
            Err(_) => Cell::Text(value.to_owned()),
        },
    };
    Some(cell)
}

fn place(rows: &mut Vec<Vec<Cell>>, row: usize, col: usize, cell: Cell) {
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, Cell::Empty);
    }
    cells[col] = cell;
}

/// Loads worksheet names and parts from `xl/workbook.xml`
///
/// # Returns
/// Tuple of (worksheets, is_1904_date_system) where worksheets are (name, zip_path) pairs
fn load_workbook(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<(Vec<(String, String)>, bool), AlertError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPart("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let name = event.attribute("name")?;
            let id = event.attribute("id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .attribute("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads the number style of every cell format record from `xl/styles.xml`
fn load_number_styles(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<Vec<NumberStyle>, AlertError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, NumberStyle>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => {
            custom_formats_context = true;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => {
            custom_formats_context = false;
        }
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?;
            let format = event.attribute("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id, NumberStyle::parse_custom_format(&format));
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => {
            format_indexes_context = true;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => {
            format_indexes_context = false;
        }
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            format_indexes.push(event.attribute("numFmtId")?.unwrap_or_else(|| "0".to_owned()));
        }
    });

    Ok(excel::load_number_styles(format_indexes, custom_formats))
}

/// Loads the whole shared string table, empty when the part is absent
fn load_shared_strings(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<Vec<String>, AlertError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads text content up to `end_tag`, skipping phonetic runs
///
/// # Arguments
/// * `reader` - XML reader positioned just after the opening tag
/// * `end_tag` - Local name of the element that closes the value
/// * `is_text_content` - Whether bare text counts without an enclosing `<t>`
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, AlertError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

    /// Builds a minimal workbook with one part per entry in `sheets` as (name, sheetData xml).
    pub(crate) fn workbook(sheets: &[(&str, &str)], shared_strings: &[&str], date1904: bool) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut put = |name: &str, content: String| {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        };

        put("[Content_Types].xml", CONTENT_TYPES.to_owned());

        let mut sheet_entries = String::new();
        let mut relationships = String::new();
        for (index, (name, _)) in sheets.iter().enumerate() {
            sheet_entries.push_str(&format!(
                r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#,
                id = index + 1
            ));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#,
                id = index + 1
            ));
        }
        put(
            "xl/workbook.xml",
            format!(
                r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="{}"/><sheets>{}</sheets></workbook>"#,
                if date1904 { 1 } else { 0 },
                sheet_entries
            ),
        );
        put(
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}<Relationship Id="rIdS" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
                relationships
            ),
        );
        // Style 0 is General, 1 is built-in date 14, 2 is a custom dd/mm/yyyy format
        put(
            "xl/styles.xml",
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts><cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="14"/><xf numFmtId="164"/></cellXfs></styleSheet>"#
                .to_owned(),
        );
        let items: String = shared_strings
            .iter()
            .map(|text| format!("<si><t>{text}</t></si>"))
            .collect();
        put(
            "xl/sharedStrings.xml",
            format!(r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{items}</sst>"#),
        );
        for (index, (_, data)) in sheets.iter().enumerate() {
            put(
                &format!("xl/worksheets/sheet{}.xml", index + 1),
                format!(
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
                ),
            );
        }

        writer.finish().unwrap().into_inner()
    }

    fn date(year: i32, month: u32, day: u32) -> Cell {
        Cell::Date(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    #[test]
    fn reads_typed_cells() {
        let data = concat!(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>Fabricante</t></is></c></row>"#,
            r#"<row r="3"><c r="A3"><v>42</v></c><c r="B3" s="1"><v>45292</v></c><c r="C3" s="2"><v>45293.5</v></c></row>"#,
            r#"<row r="4"><c r="A4" t="b"><v>1</v></c><c r="B4" t="e"><v>#N/A</v></c><c r="C4" t="d"><v>2024-02-29T00:00:00</v></c><c r="D4" s="1"/></row>"#,
        );
        let bytes = workbook(&[("Equipos", data)], &["Identificación"], false);
        let grid = XlsxGridProvider.load(bytes, None).unwrap();

        assert_eq!(grid.len(), 4);
        // D4 has a style but no value, so it never widens the grid
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.row(0).unwrap()[0], Cell::from("Identificación"));
        assert_eq!(grid.row(0).unwrap()[1], Cell::Empty);
        assert_eq!(grid.row(0).unwrap()[2], Cell::from("Fabricante"));
        assert!(grid.row(1).unwrap().iter().all(Cell::is_empty));
        assert_eq!(grid.row(2).unwrap()[0], Cell::Number(42.0));
        assert_eq!(grid.row(2).unwrap()[1], date(2024, 1, 1));
        assert_eq!(grid.row(2).unwrap()[2], date(2024, 1, 2));
        assert_eq!(grid.row(3).unwrap()[0], Cell::from("TRUE"));
        assert_eq!(grid.row(3).unwrap()[1], Cell::Empty);
        assert_eq!(grid.row(3).unwrap()[2], date(2024, 2, 29));
    }

    #[test]
    fn cells_without_references_follow_document_order() {
        let data = r#"<row><c t="inlineStr"><is><t>a</t></is></c><c t="inlineStr"><is><t>b</t></is></c></row><row><c><v>1</v></c></row>"#;
        let grid = XlsxGridProvider.load(workbook(&[("S", data)], &[], false), None).unwrap();
        assert_eq!(grid.row(0).unwrap(), &[Cell::from("a"), Cell::from("b")][..]);
        assert_eq!(grid.row(1).unwrap(), &[Cell::Number(1.0), Cell::Empty][..]);
    }

    #[test]
    fn reads_1904_serials() {
        let data = r#"<row r="1"><c r="A1" s="1"><v>0</v></c></row>"#;
        let grid = XlsxGridProvider.load(workbook(&[("S", data)], &[], true), None).unwrap();
        assert_eq!(grid.row(0).unwrap()[0], date(1904, 1, 1));
    }

    #[test]
    fn far_away_cell_is_rejected() {
        let data = r#"<row r="1"><c r="A1"><v>1</v></c></row><row r="1048576"><c r="XFD1048576"><v>2</v></c></row>"#;
        let error = XlsxGridProvider.load(workbook(&[("S", data)], &[], false), None).unwrap_err();
        assert!(matches!(
            error,
            AlertError::SpreadsheetError(SpreadsheetError::GridTooLarge {
                rows: 1_048_576,
                columns: 16_384,
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_date_serials_stay_numbers() {
        let data = r#"<row r="1"><c r="A1" s="1"><v>1e300</v></c><c r="B1" s="2"><v>3000000</v></c></row>"#;
        let grid = XlsxGridProvider.load(workbook(&[("S", data)], &[], true), None).unwrap();
        assert_eq!(grid.row(0).unwrap()[0], Cell::Number(1e300));
        assert_eq!(grid.row(0).unwrap()[1], Cell::Number(3_000_000.0));
    }

    #[test]
    fn unescapes_shared_strings() {
        let data = r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#;
        let bytes = workbook(&[("S", data)], &["Equipo &amp; Instrumento &#193;"], false);
        let grid = XlsxGridProvider.load(bytes, None).unwrap();
        assert_eq!(grid.row(0).unwrap()[0], Cell::from("Equipo & Instrumento Á"));
    }

    #[test]
    fn selects_sheet_by_pattern() {
        let first = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>first</t></is></c></row>"#;
        let second = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>second</t></is></c></row>"#;
        let bytes = workbook(&[("Resumen", first), ("Inventario 2025", second)], &[], false);

        let pattern = Pattern::new("Inventario*").unwrap();
        let grid = XlsxGridProvider.load(bytes.clone(), Some(&pattern)).unwrap();
        assert_eq!(grid.row(0).unwrap()[0], Cell::from("second"));

        let grid = XlsxGridProvider.load(bytes.clone(), None).unwrap();
        assert_eq!(grid.row(0).unwrap()[0], Cell::from("first"));

        let missing = Pattern::new("Otro").unwrap();
        assert!(matches!(
            XlsxGridProvider.load(bytes, Some(&missing)),
            Err(AlertError::SpreadsheetError(SpreadsheetError::SheetNotFound(_)))
        ));
    }

    #[test]
    fn rejects_out_of_range_shared_string() {
        let data = r#"<row r="1"><c r="A1" t="s"><v>3</v></c></row>"#;
        let result = XlsxGridProvider.load(workbook(&[("S", data)], &["only"], false), None);
        assert!(matches!(
            result,
            Err(AlertError::SpreadsheetError(SpreadsheetError::InvalidCellValue { .. }))
        ));
    }

    #[test]
    fn rejects_non_zip_bytes() {
        assert!(XlsxGridProvider.load(b"not a workbook".to_vec(), None).is_err());
    }
}

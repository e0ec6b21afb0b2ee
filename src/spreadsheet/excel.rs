//! Office Open XML workbook helpers
use crate::error::AlertError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::TimeDelta;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// How a numeric cell should be read, derived from its number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum NumberStyle {
    #[default]
    Plain,
    /// Date or date-time format; the value is a serial day number
    Date,
}

impl NumberStyle {
    /// Maps built-in number format ids to a style.
    /// Ids 14-17 are dates and 22 is date-time; time-only ids stay plain.
    pub(crate) fn parse_builtin_id(id: &str) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "22" => Some(Self::Date),
            _ => None,
        }
    }

    /// Scans a custom format code for year or day tokens outside literals and brackets.
    pub(crate) fn parse_custom_format(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                _ => (),
            }
        }

        if is_date {
            Self::Date
        } else {
            Self::Plain
        }
    }
}

/// Serial of 9999-12-31 in the 1900 system, the last date Excel displays
const MAX_SERIAL: f64 = 2_958_465.0;

/// Converts an Excel serial day number to a calendar date.
///
/// Serials in the 1900 system count from 1899-12-30 and include the fictitious
/// 1900-02-29 inherited from Lotus 1-2-3, so serials below 60 shift by one day.
///
/// # Arguments
/// * `serial` - Serial value; the fractional time of day is dropped
/// * `is_1904` - Whether the workbook uses the 1904 date system
///
/// # Returns
/// The date, or `None` for negative or out-of-range serials
pub(crate) fn serial_to_date(serial: f64, is_1904: bool) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(TimeDelta::try_days(days.checked_add(offset)?)?)
}

/// Loads worksheet relationships of a workbook
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships part within the archive
///
/// # Returns
/// Mapping of relationship ids to worksheet paths
pub(super) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<String, String>, AlertError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.attribute("Id")?;
            let kind = event.attribute("Type")?;
            let target = event.attribute("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id, to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Maps cell format records to number styles using custom and built-in formats
pub(super) fn load_number_styles(
    format_indexes: Vec<String>,
    custom_formats: HashMap<String, NumberStyle>,
) -> Vec<NumberStyle> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberStyle::parse_builtin_id(id))
                .unwrap_or_default()
        })
        .collect()
}

/// Resolves a relationship target to its path inside the archive
pub(crate) fn to_zip_path(path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_formats() {
        assert_eq!(NumberStyle::parse_custom_format("dd/mm/yyyy"), NumberStyle::Date);
        assert_eq!(NumberStyle::parse_custom_format("yyyy-mm-dd hh:mm"), NumberStyle::Date);
        assert_eq!(NumberStyle::parse_custom_format("hh:mm:ss"), NumberStyle::Plain);
        assert_eq!(NumberStyle::parse_custom_format("#,##0.00"), NumberStyle::Plain);
        assert_eq!(NumberStyle::parse_custom_format("0.0\"días\""), NumberStyle::Plain);
        assert_eq!(NumberStyle::parse_custom_format("[Red]0.00"), NumberStyle::Plain);
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(NumberStyle::parse_builtin_id("14"), Some(NumberStyle::Date));
        assert_eq!(NumberStyle::parse_builtin_id("22"), Some(NumberStyle::Date));
        assert_eq!(NumberStyle::parse_builtin_id("20"), None);
        assert_eq!(NumberStyle::parse_builtin_id("0"), None);
    }

    #[test]
    fn number_styles_fall_back_to_plain() {
        let custom = HashMap::from([("164".to_string(), NumberStyle::Date)]);
        let styles = load_number_styles(vec!["0".into(), "164".into(), "14".into()], custom);
        assert_eq!(styles, vec![NumberStyle::Plain, NumberStyle::Date, NumberStyle::Date]);
    }

    #[test]
    fn serials_1900() {
        assert_eq!(serial_to_date(1.0, false), NaiveDate::from_ymd_opt(1900, 1, 1));
        assert_eq!(serial_to_date(61.0, false), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_eq!(serial_to_date(45292.75, false), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_to_date(-1.0, false), None);
    }

    #[test]
    fn serials_1904() {
        assert_eq!(serial_to_date(0.0, true), NaiveDate::from_ymd_opt(1904, 1, 1));
    }

    #[test]
    fn huge_serials_are_not_dates() {
        assert_eq!(serial_to_date(2_958_465.0, false), NaiveDate::from_ymd_opt(9999, 12, 31));
        assert_eq!(serial_to_date(2_958_466.0, false), None);
        assert_eq!(serial_to_date(1e300, true), None);
        assert_eq!(serial_to_date(1e300, false), None);
        assert_eq!(serial_to_date(f64::INFINITY, true), None);
    }

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet3.xml"), "xl/worksheets/sheet3.xml");
    }
}

//! # Calibration Alerts
//!
//! Reads an instrument inventory workbook in which several tables (plant, VST2,
//! VST3) are stacked on one worksheet, and reports the instruments whose next
//! calibration is overdue or falls within the alert window.
//!
//! ## Layout
//!
//! - [`spreadsheet`]: decodes xlsx bytes into a [`RawGrid`] of tagged [`Cell`]s
//! - [`calibration`]: header detection, block segmentation, field normalization,
//!   classification and report assembly
//! - [`notify`]: HTML rendering and SMTP delivery
//! - [`config`]: TOML configuration with defaults for the reference workbook
//!
//! The sheet conventions (header keywords, category titles, due-date spellings,
//! display columns) live in [`MatchRules`] and can be replaced from configuration.
use chrono::NaiveDate;
use tracing::info;

pub mod calibration;
pub mod config;
pub mod error;
mod helpers;
pub mod notify;
pub mod spreadsheet;

pub use calibration::evaluate;
pub use calibration::AlertSettings;
pub use calibration::CalibrationError;
pub use calibration::Category;
pub use calibration::MatchRules;
pub use calibration::Report;
pub use config::Config;
pub use error::AlertError;
pub use error::ResultMessage;
pub use helpers::reader::SourceError;
pub use helpers::reader::SourceReader;
pub use helpers::xml::XmlError;
pub use notify::Mailer;
pub use notify::Notification;
pub use spreadsheet::Cell;
pub use spreadsheet::GridProvider;
pub use spreadsheet::RawGrid;
pub use spreadsheet::XlsxGridProvider;

/// Fetches the configured workbook, evaluates it and renders the alert message.
///
/// # Arguments
///
/// * `config` - Source, worksheet, threshold, rules and subject
/// * `today` - Reference date
///
/// # Returns
///
/// * `Result<(Report, Notification), AlertError>` - The full report and the rendered message
pub fn prepare(config: &Config, today: NaiveDate) -> Result<(Report, Notification), AlertError> {
    let settings = config.alert_settings()?;
    let source = config.source()?;
    let sheet = config.sheet_pattern()?;

    let bytes = SourceReader::new().read(source).with_prefix("fetch workbook")?;
    let grid = XlsxGridProvider
        .load(bytes, sheet.as_ref())
        .with_prefix("decode workbook")?;
    info!(rows = grid.len(), columns = grid.width(), "worksheet loaded");

    let report = evaluate(&grid, &settings, today)?;
    info!(
        overdue = report.overdue.rows.len(),
        upcoming = report.upcoming.rows.len(),
        threshold = settings.threshold_days,
        "report assembled"
    );
    let notification = notify::compose(&report, &settings.rules, &config.mail.subject);
    Ok((report, notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn prepares_message_from_local_workbook() {
        // 45292 is 2024-01-01
        let data = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>PLANTA</t></is></c></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Identificación</t></is></c><c r="B2" t="inlineStr"><is><t>Observaciones</t></is></c><c r="C2" t="inlineStr"><is><t>Fecha próxima cal</t></is></c></row>"#,
            r#"<row r="3"><c r="A3" t="inlineStr"><is><t>BAL-01</t></is></c><c r="B3" t="inlineStr"><is><t>revisar</t></is></c><c r="C3" s="1"><v>45292</v></c></row>"#,
        );
        let bytes = spreadsheet::xlsx::tests::workbook(&[("Hoja1", data)], &[], false);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let config = Config {
            source: Some(file.path().display().to_string()),
            ..Config::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let (report, notification) = prepare(&config, today).unwrap();

        assert_eq!(report.overdue.rows.len(), 1);
        assert_eq!(report.overdue.rows[0].days_remaining, Some(-4));
        assert_eq!(notification.subject, config::DEFAULT_SUBJECT);
        assert!(notification.html.contains("<th>Identificacion</th><th>Fecha Proxima</th><th>Tipo</th>"));
        assert!(notification.html.contains("<td>BAL-01</td><td>2024-01-01</td><td>PLANT</td>"));
        assert!(!notification.html.contains("revisar"));
    }

    #[test]
    fn missing_source_fails_before_fetching() {
        let error = prepare(&Config::default(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).unwrap_err();
        assert!(matches!(error, AlertError::ConfigError(_)));
    }

    #[test]
    fn unreadable_workbook_is_reported_with_context() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not a workbook").unwrap();
        let config = Config {
            source: Some(file.path().display().to_string()),
            ..Config::default()
        };
        let error = prepare(&config, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).unwrap_err();
        assert!(error.to_string().starts_with("decode workbook: "));
    }
}

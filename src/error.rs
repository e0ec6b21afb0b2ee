use thiserror::Error;

/// Main error type for the calibration alerts pipeline.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    UrlError(#[from] url::ParseError),

    #[error("{0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error("{0}")]
    EmailError(#[from] lettre::error::Error),

    #[error("{0}")]
    AddressError(#[from] lettre::address::AddressError),

    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    SourceError(#[from] crate::helpers::reader::SourceError),

    // Domain module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    CalibrationError(#[from] crate::calibration::CalibrationError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("{0}")]
    NotifyError(#[from] crate::notify::NotifyError),
}

pub trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, AlertError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| AlertError::WithContextError(format!("{}: {}", message, e)))
    }
}

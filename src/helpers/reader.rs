use crate::error::AlertError;
use std::fs;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Download of '{0}' failed with status {1}")]
    RemoteStatusError(String, u16),

    #[error("No data from source: '{0}'")]
    NoDataError(String),
}

/// Reads workbook bytes from either a local path or a remote URL
pub struct SourceReader {
    client: reqwest::blocking::Client,
}

impl SourceReader {
    pub fn new() -> SourceReader {
        SourceReader {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Loads the whole source into memory.
    ///
    /// Remote sources are fetched with a single GET; there is no retry.
    ///
    /// # Arguments
    /// * `source` - Path or URL of the workbook
    ///
    /// # Returns
    /// * `Result<Vec<u8>, AlertError>` - Raw workbook bytes
    pub fn read(&self, source: &str) -> Result<Vec<u8>, AlertError> {
        let bytes = if Self::is_remote_url(source) {
            self.download(source)?
        } else {
            let path = match Url::parse(source) {
                Ok(url) if url.scheme() == "file" => url
                    .to_file_path()
                    .map_err(|_| SourceError::NoDataError(source.to_owned()))?,
                _ => source.into(),
            };
            fs::read(path)?
        };

        if bytes.is_empty() {
            Err(SourceError::NoDataError(source.to_owned()))?;
        }
        debug!(source, size = bytes.len(), "source loaded");
        Ok(bytes)
    }

    /// Checks if a source names a remote URL
    pub fn is_remote_url(source: &str) -> bool {
        if let Ok(url) = Url::parse(source) {
            url.scheme() != "file"
        } else {
            false
        }
    }

    fn download(&self, source: &str) -> Result<Vec<u8>, AlertError> {
        let url = Url::parse(source)?;
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            Err(SourceError::RemoteStatusError(source.to_owned(), status.as_u16()))?;
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new()
    }
}

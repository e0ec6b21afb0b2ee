//! XML parsing utilities for the Office Open XML parts of a workbook
//! Wraps quick-xml with the reader configuration the spreadsheet parser relies on

use crate::error::AlertError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// Event reader over a workbook part with a reusable buffer
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` must produce both Start and End so cell state resets
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, AlertError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(AlertError::XmlError(error)),
        }
    }
}

/// Attribute access on start tags
pub(crate) trait XmlNodeHelper {
    /// Gets the unescaped value of an attribute, matched by local name
    fn attribute(&self, name: &str) -> Result<Option<String>, AlertError>;
}

impl XmlNodeHelper for BytesStart<'_> {
    fn attribute(&self, name: &str) -> Result<Option<String>, AlertError> {
        for result in self.attributes() {
            let attribute = result?;
            if attribute.key.local_name().as_ref() == name.as_bytes() {
                return Ok(Some(attribute.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }
}

/// Appends entity and character references to accumulated text
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), AlertError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), AlertError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

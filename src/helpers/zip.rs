//! ZIP archive helper utilities for the xlsx container
//! Locates workbook parts by name and opens them as XML readers

use crate::error::AlertError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Helper trait for reading workbook parts out of a ZIP archive
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a part by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, AlertError>;

    /// Creates an XML reader for a part, `None` when the part does not exist
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, AlertError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, AlertError> {
        let pattern = name.replace('\\', "/");
        let path = self
            .file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, AlertError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive() -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/workbook.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<workbook/>").unwrap();
        let cursor = writer.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn finds_parts_ignoring_case_and_separator() {
        let mut zip = archive();
        assert!(zip.file("XL\\Workbook.xml").unwrap().is_some());
        assert!(zip.file("xl/styles.xml").unwrap().is_none());
    }

    #[test]
    fn missing_part_has_no_reader() {
        let mut zip = archive();
        assert!(zip.xml_reader("xl/sharedStrings.xml").unwrap().is_none());
        assert!(zip.xml_reader("xl/workbook.xml").unwrap().is_some());
    }
}

//! Lookup helpers for the parts of an OOXML package.
//! Part names inside workbooks are not always cased or separated consistently,
//! so lookups ignore ASCII case and accept backslashes.

use crate::error::NormalizerError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Finds a package part by name, or `None` when the part is absent
    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, NormalizerError>;

    /// Opens an XML reader over a package part
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, NormalizerError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, NormalizerError> {
        let wanted = name.replace('\\', "/");
        let found = self
            .file_names()
            .find(|file_name| wanted.eq_ignore_ascii_case(&file_name.replace('\\', "/")))
            .map(str::to_owned);
        match found.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(part) => Ok(part),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, NormalizerError> {
        Ok(self.part(name)?.map(|part| XmlReader::new(BufReader::new(part))))
    }
}

//! Microsoft Office Excel package helpers
use crate::error::NormalizerError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Opens an Excel package after rejecting encrypted (CFB) containers.
///
/// # Arguments
/// * `name` - Workbook name used in error messages
/// * `reader` - Package bytes
pub(super) fn open(name: &str, mut reader: UnifiedReader) -> Result<ZipArchive<UnifiedReader>, NormalizerError> {
    if reader.is_cfb_container() {
        Err(SpreadsheetError::SpreadsheetPasswordProtected(name.to_owned()))?;
    }
    Ok(ZipArchive::new(reader)?)
}

/// Loads worksheet relationships from an Excel package
///
/// # Returns
/// Mapping of relationship ids to worksheet paths inside the archive
pub(super) fn load_relationships(
    zip: &mut ZipArchive<UnifiedReader>,
    path: &str,
) -> Result<HashMap<String, String>, NormalizerError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // chartsheets and dialog sheets carry no cell grid
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves style format ids to number formats, custom formats first.
pub(super) fn resolve_number_formats(
    format_ids: Vec<String>,
    custom_formats: HashMap<String, NumberFormat>,
) -> Vec<NumberFormat> {
    format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberFormat::from_builtin_id(id))
                .unwrap_or_default()
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the archive.
pub(crate) fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_owned()
    } else if path.starts_with("xl/") {
        path.to_owned()
    } else {
        format!("xl/{path}")
    }
}

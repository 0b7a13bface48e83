use crate::error::NormalizerError;
use crate::error::ResultMessage;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::excel;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::CellRange;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt"); // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs"); // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf"); // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet"); // Worksheet definition
const TAG_ROW: QName = QName(b"row"); // Row in worksheet
const TAG_CELL: QName = QName(b"c"); // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is"); // Inline string value
const TAG_VALUE: QName = QName(b"v"); // Cell value content
const TAG_MERGE_CELL: QName = QName(b"mergeCell"); // Merged range

/// Value source of a `<c>` element, from its `t` attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ValueKind {
    SharedString,
    InlineString,
    Typed(CellType),
}

/// An Excel 2007+ workbook (.xlsx, .xlsm)
pub struct XlsxWorkbook {
    /// File name of the workbook
    name: String,
    /// ZIP archive containing the package parts
    zip: ZipArchive<UnifiedReader>,
    /// Number formats indexed by cell style id
    number_formats: Vec<NumberFormat>,
    /// Shared string table
    shared_strings: Vec<String>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Whether dates use the 1904 epoch
    is_1904: bool,
}

impl XlsxWorkbook {
    /// Opens an XLSX workbook from a local path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<XlsxWorkbook, NormalizerError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let reader = UnifiedReader::open(path).with_prefix(&name)?;
        XlsxWorkbook::load(name, reader)
    }

    /// Opens an XLSX workbook from bytes already in memory
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<XlsxWorkbook, NormalizerError> {
        XlsxWorkbook::load(name.to_owned(), UnifiedReader::from_bytes(bytes))
    }

    fn load(name: String, reader: UnifiedReader) -> Result<XlsxWorkbook, NormalizerError> {
        let mut zip = excel::open(&name, reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip).with_prefix(&name)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmpty(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip).with_prefix(&name)?;
        let shared_strings = load_shared_strings(&mut zip).with_prefix(&name)?;
        debug!(
            workbook = %name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            is_1904,
            "opened xlsx workbook"
        );
        Ok(XlsxWorkbook {
            name,
            zip,
            number_formats,
            shared_strings,
            sheets,
            is_1904,
        })
    }

    /// Resolves the cell type of a numeric cell from its style id
    fn styled_type(&self, style: Option<usize>) -> CellType {
        style
            .and_then(|index| self.number_formats.get(index))
            .map(NumberFormat::cell_type)
            .unwrap_or(CellType::Number)
    }
}

impl Workbook for XlsxWorkbook {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Parses one worksheet part into a grid, including its merged ranges.
    fn read_sheet(&mut self, name: &str) -> Result<Grid, NormalizerError> {
        let zip_path = self
            .sheets
            .iter()
            .find(|(sheet_name, _)| sheet_name == name)
            .map(|(_, zip_path)| zip_path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(name.to_owned()))?;

        let mut grid = Grid::new(name);
        let mut pending = Vec::<(usize, usize, ValueKind, Option<usize>, String)>::new();
        {
            let mut reader = self
                .zip
                .xml_reader(&zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = ValueKind::Typed(CellType::Number);
            let mut style = None::<usize>;
            let mut value = String::new();
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    row_count = event.parse_attribute_value::<usize>("r")?.unwrap_or(row_count + 1);
                    col_count = 0;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event
                        .get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row_count.max(1), col_count + 1));
                    col_count = col;
                    kind = match event.get_attribute_value("t")?.as_deref() {
                        Some("s") => ValueKind::SharedString,
                        Some("inlineStr") => ValueKind::InlineString,
                        Some("str") | Some("d") => ValueKind::Typed(CellType::Text),
                        Some("b") => ValueKind::Typed(CellType::Boolean),
                        Some("e") => ValueKind::Typed(CellType::Error),
                        _ => ValueKind::Typed(CellType::Number),
                    };
                    style = event
                        .get_attribute_value("s")?
                        .filter(|id| !id.is_empty())
                        .map(|id| id.parse::<usize>())
                        .transpose()?;
                    value.clear();
                }
                Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                    value = reader.read_text(TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if event.name() == TAG_VALUE => {
                    value = reader.read_text(TAG_VALUE, true)?;
                }
                Event::End(event) if event.name() == TAG_CELL => {
                    if !value.is_empty() {
                        pending.push((row, col, kind, style, std::mem::take(&mut value)));
                    }
                }
                Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                    if let Some(reference) = event.get_attribute_value("ref")? {
                        grid.add_merge(CellRange::try_from(reference.as_ref())?);
                    }
                }
            });
        }

        for (row, col, kind, style, value) in pending {
            let cell = match kind {
                ValueKind::SharedString => {
                    let index = value.trim().parse::<usize>()?;
                    let text = self
                        .shared_strings
                        .get(index)
                        .map(String::as_str)
                        .unwrap_or_default();
                    Cell::text(row, col, text)
                }
                ValueKind::InlineString => Cell::text(row, col, &value),
                ValueKind::Typed(CellType::Number) => {
                    Cell::new(row, col, self.styled_type(style), value, self.is_1904)
                }
                ValueKind::Typed(kind) => Cell::new(row, col, kind, value, self.is_1904),
            };
            grid.push(cell);
        }
        debug!(
            workbook = %self.name,
            sheet = name,
            cells = grid.cells().len(),
            last_row = grid.last_row(),
            last_col = grid.last_col(),
            "read sheet"
        );
        Ok(grid)
    }
}

/// Loads worksheet names and paths plus the date system from `xl/workbook.xml`
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), NormalizerError> {
    let relationships = excel::load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats indexed by style id from `xl/styles.xml`
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<NumberFormat>, NormalizerError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, NumberFormat>::new();
    let mut format_indexes_context = false;
    let mut format_ids = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), NumberFormat::from_format_code(&format));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.map(|id| id.to_string());
            format_ids.push(id.unwrap_or_else(|| "0".to_owned()));
        }
    });

    Ok(excel::resolve_number_formats(format_ids, custom_formats))
}

/// Loads the shared string table from `xl/sharedStrings.xml`
fn load_shared_strings(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, NormalizerError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(reader.read_text(TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

//! Event-driven XML reading for SpreadsheetML package parts.

use crate::error::NormalizerError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Run of text inside shared strings and inline strings
const TAG_TEXT: QName = QName(b"t");
/// Phonetic hint run; its text is not part of the cell value
const TAG_PHONETIC_RUN: QName = QName(b"rPh");

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntity(String),

    #[error("Attribute '{0}' has unparsable value '{1}'")]
    AttributeValue(String, String),
}

/// Pull reader with a reusable event buffer
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c/>` arrives as Start + End so callers only match one shape
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, or `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, NormalizerError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }

    /// Collects the visible text up to the closing `end_tag`.
    ///
    /// With `bare` set, text directly inside the element counts (`<v>`);
    /// otherwise only text inside `<t>` runs does (`<si>`, `<is>`).
    pub(crate) fn read_text(&mut self, end_tag: QName, bare: bool) -> Result<String, NormalizerError> {
        let mut in_phonetic = false;
        let mut in_text = bare;
        let mut text = String::new();
        while let Some(event) = self.next()? {
            match event {
                Event::End(event) if event.name() == end_tag => break,
                Event::Start(event) if event.name() == TAG_PHONETIC_RUN => in_phonetic = true,
                Event::End(event) if event.name() == TAG_PHONETIC_RUN => in_phonetic = false,
                Event::Start(event) if !in_phonetic && event.name() == TAG_TEXT => in_text = true,
                Event::End(event) if event.name() == TAG_TEXT => in_text = bare,
                Event::Text(event) if in_text => text.push_str(&event.xml_content()?),
                Event::CData(event) if in_text => text.push_str(&event.xml_content()?),
                Event::GeneralRef(event) if in_text => push_reference(&mut text, &event)?,
                _ => (),
            }
        }
        Ok(text)
    }
}

/// Appends a character or entity reference (`&#x41;`, `&amp;`) to `text`
fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), NormalizerError> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16)?,
            None => number.parse::<u32>()?,
        };
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
        Ok(())
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
        Ok(())
    } else {
        Err(XmlError::UnknownEntity(raw.to_string()))?
    }
}

/// Attribute access on start tags
pub(crate) trait XmlNodeHelper<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, NormalizerError>;

    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, NormalizerError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, NormalizerError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, NormalizerError> {
        match self.get_attribute_value(name)? {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| XmlError::AttributeValue(name.to_owned(), value.to_string()).into()),
            None => Ok(None),
        }
    }
}

/// Loops over the events of an [`XmlReader`], running the first matching arm.
/// Unmatched events are ignored and the loop ends at end of document.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}

//! XML reading utilities for the OOXML parts of a workbook.
//! Wraps quick-xml with the configuration spreadsheet parts need, plus helpers
//! for attribute lookup and text runs.

use crate::error::RustySummaryError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// XML tag for phonetic runs, skipped when reading text
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
/// XML tag wrapping a run of text
const TAG_TEXT: QName = QName(b"t");

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// XML reader wrapper configured for worksheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a reader that expands empty elements so every cell has a Start and an End event
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RustySummaryError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RustySummaryError::XmlError(error)),
        }
    }

    /// Collects the text of an element up to its `end_tag`.
    ///
    /// Rich-text strings keep their characters in `<t>` runs and may carry phonetic
    /// `<rPh>` guides that must not leak into the value. When `is_text_content` is set
    /// the element body is itself the text (as in `<v>`).
    pub(crate) fn read_text(&mut self, end_tag: QName, is_text_content: bool) -> Result<String, RustySummaryError> {
        let mut is_phonetic_text = false;
        let mut is_text = is_text_content;
        let mut text = String::new();
        crate::match_xml_events!(self => {
            Event::End(event) if event.name() == end_tag => break,
            Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
            Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
            Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
            Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = is_text_content,
            Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
        });
        Ok(text)
    }
}

/// Helper trait for XML attributes
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, RustySummaryError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, RustySummaryError> {
        Ok(self.unescape_value()?)
    }
}

/// Helper trait for XML nodes providing attribute access
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by its qualified name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustySummaryError>;

    /// Gets an attribute value by local name, ignoring any namespace prefix (`r:id` matches `id`)
    fn get_local_attribute_value(&'a self, local_name: &[u8]) -> Result<Option<Cow<'a, str>>, RustySummaryError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustySummaryError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn get_local_attribute_value(&'a self, local_name: &[u8]) -> Result<Option<Cow<'a, str>>, RustySummaryError> {
        for result in self.attributes() {
            let attribute = result?;
            if attribute.key.local_name().as_ref() == local_name {
                return attribute.get_value().map(Some);
            }
        }
        Ok(None)
    }
}

/// Helper trait for building text content from entity and character references
pub(crate) trait XmlTextContextHelper {
    /// Appends the character a reference such as `&amp;` or `&#x41;` stands for
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustySummaryError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustySummaryError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?
        }
        Ok(())
    }
}

/// Drives an [`XmlReader`] through its events, dispatching to the given match arms.
/// Unmatched events are skipped; `break` inside an arm stops reading.
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

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(xml: &str) -> XmlReader<&[u8]> {
        XmlReader::new(xml.as_bytes())
    }

    #[test]
    fn read_text_skips_phonetic_runs() {
        let mut reader = reader("<si><r><t>Net </t></r><r><t>Revenue</t></r><rPh><t>ネット</t></rPh></si>");
        assert!(reader.next().unwrap().is_some());
        let text = reader.read_text(QName(b"si"), false).unwrap();
        assert_eq!(text, "Net Revenue");
    }

    #[test]
    fn read_text_resolves_references() {
        let mut reader = reader("<v>Ad Exchange revenue (&#36;) &amp; fees</v>");
        assert!(reader.next().unwrap().is_some());
        let text = reader.read_text(QName(b"v"), true).unwrap();
        assert_eq!(text, "Ad Exchange revenue ($) & fees");
    }

    #[test]
    fn local_attribute_ignores_prefix() {
        let mut reader = reader(r#"<sheet name="Report data" r:id="rId3"/>"#);
        match reader.next().unwrap() {
            Some(Event::Start(event)) => {
                let event = event.into_owned();
                assert_eq!(event.get_attribute_value("name").unwrap().as_deref(), Some("Report data"));
                assert_eq!(event.get_local_attribute_value(b"id").unwrap().as_deref(), Some("rId3"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

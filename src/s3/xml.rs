//! XML boundary: response bodies parse into a nested [`XmlValue`] map, request bodies
//! are written with `quick_xml::Writer` so keys are always escaped.
//!
//! Repeated child elements collapse into [`XmlValue::List`], a lone child stays a
//! plain value. [`XmlValue::children`] hides that difference from callers.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

use crate::s3::error::{Result, S3Error};

/// S3 2006-03-01 API namespace
pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Parsed element content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// Leaf element text (empty for `<Tag/>`)
    Text(String),
    /// Element with child elements, keyed by local name
    Map(BTreeMap<String, XmlValue>),
    /// Same-named siblings, in document order
    List(Vec<XmlValue>),
}

impl XmlValue {
    /// Direct child by name
    pub fn get(&self, name: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Map(map) => map.get(name),
            _ => None,
        }
    }

    /// All children with this name, whether the document had one or many
    pub fn children(&self, name: &str) -> Vec<&XmlValue> {
        match self.get(name) {
            None => Vec::new(),
            Some(XmlValue::List(items)) => items.iter().collect(),
            Some(single) => vec![single],
        }
    }

    /// Text of a leaf child
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(XmlValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn insert_child(map: &mut BTreeMap<String, XmlValue>, name: String, value: XmlValue) {
        match map.remove(&name) {
            None => {
                map.insert(name, value);
            }
            Some(XmlValue::List(mut items)) => {
                items.push(value);
                map.insert(name, XmlValue::List(items));
            }
            Some(previous) => {
                map.insert(name, XmlValue::List(vec![previous, value]));
            }
        }
    }
}

/// Root element of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub value: XmlValue,
}

struct Frame {
    name: String,
    children: BTreeMap<String, XmlValue>,
    text: String,
}

impl Frame {
    fn new(start: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            name: std::str::from_utf8(start.local_name().as_ref())?.to_string(),
            children: BTreeMap::new(),
            text: String::new(),
        })
    }

    fn finish(self) -> (String, XmlValue) {
        let value = if self.children.is_empty() {
            XmlValue::Text(self.text)
        } else {
            // Inter-element whitespace is dropped once children exist
            XmlValue::Map(self.children)
        };
        (self.name, value)
    }
}

/// Parse a document into its root element
pub fn parse(xml_data: &[u8]) -> Result<XmlElement> {
    let mut reader = Reader::from_reader(xml_data);
    let mut stack: Vec<Frame> = Vec::with_capacity(8);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Frame::new(&e)?),
            Ok(Event::Empty(e)) => {
                let (name, value) = Frame::new(&e)?.finish();
                match stack.last_mut() {
                    Some(parent) => XmlValue::insert_child(&mut parent.children, name, value),
                    None => return Ok(XmlElement { name, value }),
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(std::str::from_utf8(&e)?);
                }
            }
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| S3Error::XmlParse("unbalanced closing tag".to_string()))?;
                let (name, value) = frame.finish();
                match stack.last_mut() {
                    Some(parent) => XmlValue::insert_child(&mut parent.children, name, value),
                    None => return Ok(XmlElement { name, value }),
                }
            }
            Ok(Event::Eof) => {
                return Err(S3Error::XmlParse(if stack.is_empty() {
                    "document has no root element".to_string()
                } else {
                    "unexpected end of document".to_string()
                }));
            }
            Err(e) => return Err(S3Error::XmlParse(e.to_string())),
            _ => {}
        }
    }
}

/// Serialize a multi-object delete request body
pub fn write_delete_body(keys: &[String], quiet: bool) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::with_capacity(keys.len() * 64 + 128));

    writer.write_event(Event::Start(
        BytesStart::new("Delete").with_attributes([("xmlns", S3_XMLNS)]),
    ))?;
    for key in keys {
        writer.write_event(Event::Start(BytesStart::new("Object")))?;
        write_text_element(&mut writer, "Key", key)?;
        writer.write_event(Event::End(BytesEnd::new("Object")))?;
    }
    if quiet {
        write_text_element(&mut writer, "Quiet", "true")?;
    }
    writer.write_event(Event::End(BytesEnd::new("Delete")))?;

    Ok(writer.into_inner())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_repeated_children_normalize() {
        let one = parse(b"<R><Contents><Key>a</Key></Contents></R>").unwrap();
        let many = parse(b"<R><Contents><Key>a</Key></Contents><Contents><Key>b</Key></Contents></R>")
            .unwrap();

        assert!(matches!(one.value.get("Contents"), Some(XmlValue::Map(_))));
        assert!(matches!(many.value.get("Contents"), Some(XmlValue::List(_))));

        let keys = |doc: &XmlElement| -> Vec<String> {
            doc.value
                .children("Contents")
                .iter()
                .filter_map(|c| c.text("Key"))
                .map(str::to_string)
                .collect()
        };
        assert_eq!(keys(&one), vec!["a"]);
        assert_eq!(keys(&many), vec!["a", "b"]);
        assert!(one.value.children("Missing").is_empty());
    }

    #[test]
    fn test_parse_text_entities_and_empty() {
        let doc = parse(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>media</Name>
  <Prefix/>
  <Key>a &amp; b &lt;c&gt; </Key>
</ListBucketResult>"#,
        )
        .unwrap();
        assert_eq!(doc.name, "ListBucketResult");
        assert_eq!(doc.value.text("Name"), Some("media"));
        assert_eq!(doc.value.text("Prefix"), Some(""));
        // Leaf text is kept untrimmed, keys may end in spaces
        assert_eq!(doc.value.text("Key"), Some("a & b <c> "));
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        assert!(matches!(parse(b"<R><Contents>"), Err(S3Error::XmlParse(_))));
        assert!(matches!(parse(b""), Err(S3Error::XmlParse(_))));
    }

    #[test]
    fn test_delete_body_escapes_keys() {
        let keys = vec!["plain.txt".to_string(), "a&b<c>\"d\".txt".to_string()];
        let body = String::from_utf8(write_delete_body(&keys, true).unwrap()).unwrap();

        assert!(body.starts_with(r#"<Delete xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#));
        assert!(body.contains("<Object><Key>plain.txt</Key></Object>"));
        assert!(!body.contains("a&b<c>"));
        assert!(body.ends_with("<Quiet>true</Quiet></Delete>"));

        // Escaped keys survive a parse
        let doc = parse(body.as_bytes()).unwrap();
        let parsed: Vec<&str> = doc
            .value
            .children("Object")
            .iter()
            .filter_map(|o| o.text("Key"))
            .collect();
        assert_eq!(parsed, vec!["plain.txt", "a&b<c>\"d\".txt"]);
    }

    #[test]
    fn test_delete_body_without_quiet() {
        let body = write_delete_body(&["k".to_string()], false).unwrap();
        assert!(!String::from_utf8(body).unwrap().contains("Quiet"));
    }
}

//! Raw XML document trees
//!
//! Converts an XML document into nested [`serde_json::Value`]s using the
//! common dict-of-XML layout:
//!
//! - attributes become `@name` keys
//! - text next to attributes or children becomes `#text`
//! - an element holding only text becomes a plain string
//! - an empty element becomes `null`
//! - repeated child elements collapse into an array
//!
//! Qualified names are kept verbatim (`sdk:platform`) and document order is
//! preserved. The returned value is an object with the root element as its
//! only key.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::{Error, Result};

pub const TEXT_KEY: &str = "#text";

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value()?.into_owned();
            fields.insert(key, Value::String(value));
        }

        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

fn attach(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

/// Parse an XML document into a raw tree.
pub fn parse_xml(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = Map::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Element::open(&start)?.into_value();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.fields, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::schema("unbalanced closing tag"))?;
                let (name, value) = element.into_value();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.fields, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::schema("document ended inside an element"));
    }
    if root.len() != 1 {
        return Err(Error::schema("document must have exactly one root element"));
    }

    Ok(Value::Object(root))
}

/// Split a parsed document into its root element name and node.
pub fn root(document: &Value) -> Result<(&str, &Value)> {
    document
        .as_object()
        .and_then(|map| map.iter().next())
        .map(|(name, node)| (name.as_str(), node))
        .ok_or_else(|| Error::schema("document has no root element"))
}

// ==============================================================================
// evidence/document.rs - Path-Addressable ClinVar Documents
// ==============================================================================
// Description: Converts E-utilities XML into a JSON tree and walks paths in it
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Mapping (the root element itself is dropped, its content is the document):
//   <A x="1"><B>t</B><B>u</B></A>   ->  {"x": "1", "B": ["t", "u"]}
//   <C>text</C>                      ->  "text"
//   <D k="v">text</D>                ->  {"k": "v", "$text": "text"}
// ==============================================================================

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding the text content of elements that also carry attributes or children
pub const TEXT_KEY: &str = "$text";

/// Parsed evidence document
pub type Document = Value;

static MISSING: Value = Value::Null;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Document contains no root element")]
    Empty,

    #[error("Document ended inside <{0}>")]
    Truncated(String),
}

/// One step in a document path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    Key(&'a str),
    Index(usize),
}

/// Parse an XML document into a path-addressable tree
pub fn parse_xml(xml: &str) -> Result<Document, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(Element::open(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = Element::open(e)?;
                close(element, &mut stack, &mut root);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| DocumentError::Xml(err.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    close(element, &mut stack, &mut root);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Xml(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(DocumentError::Truncated(open.name));
    }

    root.ok_or(DocumentError::Empty)
}

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, DocumentError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| DocumentError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| DocumentError::Xml(e.to_string()))?
                .into_owned();
            fields.insert(key, Value::String(value));
        }

        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        if self.fields.is_empty() {
            return Value::String(self.text);
        }

        let mut fields = self.fields;
        if !self.text.is_empty() {
            fields.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        Value::Object(fields)
    }
}

/// Attach a finished element to its parent, or make it the root
fn close(element: Element, stack: &mut [Element], root: &mut Option<Value>) {
    let name = element.name.clone();
    let value = element.into_value();

    match stack.last_mut() {
        Some(parent) => match parent.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                parent.fields.insert(name, value);
            }
        },
        None => {
            if root.is_none() {
                *root = Some(value);
            }
        }
    }
}

/// Walk a path, yielding `Null` where it leads nowhere
///
/// A key applied to a list looks inside its first item, and index 0 of a
/// single node is the node itself, so callers need not know whether an
/// element happened to repeat.
pub fn path<'a>(doc: &'a Value, steps: &[Step<'_>]) -> &'a Value {
    steps.iter().fold(doc, |node, step| match step {
        Step::Key(key) => match node {
            Value::Array(items) => items
                .first()
                .and_then(|first| first.get(*key))
                .unwrap_or(&MISSING),
            _ => node.get(*key).unwrap_or(&MISSING),
        },
        Step::Index(index) => match node {
            Value::Array(items) => items.get(*index).unwrap_or(&MISSING),
            Value::Null => &MISSING,
            single if *index == 0 => single,
            _ => &MISSING,
        },
    })
}

/// All nodes at a position that may hold one element or a repeated list
pub fn items(node: &Value) -> Vec<&Value> {
    match node {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        single => vec![single],
    }
}

/// Text content of a node; empty when there is none
pub fn text(node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(fields) => fields.get(TEXT_KEY).map(text).unwrap_or_default(),
        Value::Array(items) => items.first().map(text).unwrap_or_default(),
        Value::Null => String::new(),
    }
}

/// Text at a path
pub fn text_at(doc: &Value, steps: &[Step<'_>]) -> String {
    text(path(doc, steps))
}

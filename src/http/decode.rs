//! Content-type classification and response body decoding.
//!
//! Two families are recognized: JSON (`application/json`,
//! `application/javascript`, `text/javascript`) and XML (`application/xml`,
//! `application/atom+xml`, `application/rss+xml`). Anything else is a fatal
//! configuration error, never a silent empty result.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ConfigError, SourceError};

const JSON_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "text/javascript",
];
const XML_TYPES: &[&str] = &["application/xml", "application/atom+xml", "application/rss+xml"];

/// Body format families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
}

/// Classify a `Content-Type` header value, ignoring parameters like
/// `; charset=utf-8`.
pub fn classify(content_type: &str) -> Result<BodyFormat, ConfigError> {
    let token: String = content_type
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '+' | '-' | '.'))
        .collect::<String>()
        .to_ascii_lowercase();

    if JSON_TYPES.contains(&token.as_str()) {
        Ok(BodyFormat::Json)
    } else if XML_TYPES.contains(&token.as_str()) {
        Ok(BodyFormat::Xml)
    } else {
        Err(ConfigError::UnknownContentType(token))
    }
}

/// Decode a response body according to its content type.
pub fn decode_body(content_type: &str, body: &str) -> Result<Value, SourceError> {
    let format = classify(content_type)?;
    trace!("decoding {} byte body as {:?}", body.len(), format);
    match format {
        BodyFormat::Json => {
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))
        }
        BodyFormat::Xml => xml_to_value(body),
    }
}

/// Convert an XML document into a JSON tree.
///
/// Repeated sibling elements collapse into arrays, attributes surface as
/// `@`-prefixed keys, and an element carrying only text becomes a plain
/// string (or keeps the text under `#text` when attributes are present).
pub fn xml_to_value(xml: &str) -> Result<Value, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = Map::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                let name = tag_name(&start);
                let child = read_element(&mut reader, &start)?;
                push_child(&mut root, name, child);
            }
            Ok(Event::Empty(start)) => {
                let name = tag_name(&start);
                push_child(&mut root, name, empty_element(&start));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SourceError::Decode(format!("xml parse error: {e}"))),
        }
        buf.clear();
    }
    Ok(Value::Object(root))
}

/// Parse everything between a start tag and its matching end tag.
fn read_element(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Value, SourceError> {
    let mut map = Map::new();
    collect_attributes(start, &mut map);

    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(child_start)) => {
                let name = tag_name(&child_start);
                let child = read_element(reader, &child_start)?;
                push_child(&mut map, name, child);
            }
            Ok(Event::Empty(child_start)) => {
                let name = tag_name(&child_start);
                push_child(&mut map, name, empty_element(&child_start));
            }
            Ok(Event::Text(t)) => {
                let content = t.unescape().unwrap_or_default().trim().to_string();
                if !content.is_empty() {
                    text = content;
                }
            }
            Ok(Event::CData(t)) => {
                let content = String::from_utf8_lossy(&t).trim().to_string();
                if !content.is_empty() {
                    text = content;
                }
            }
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SourceError::Decode(format!("xml parse error: {e}"))),
        }
        buf.clear();
    }

    if map.is_empty() {
        if text.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::String(text))
        }
    } else {
        if !text.is_empty() && !map.keys().any(|k| !k.starts_with('@')) {
            map.insert("#text".to_string(), Value::String(text));
        }
        Ok(Value::Object(map))
    }
}

fn empty_element(start: &BytesStart) -> Value {
    let mut map = Map::new();
    collect_attributes(start, &mut map);
    if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    }
}

fn collect_attributes(start: &BytesStart, map: &mut Map<String, Value>) {
    for attr in start.attributes().flatten() {
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = attr.unescape_value().unwrap_or_default().to_string();
        map.insert(key, Value::String(value));
    }
}

fn tag_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_string()
}

/// Insert a child value, promoting repeated tags to arrays.
fn push_child(map: &mut Map<String, Value>, name: String, child: Value) {
    if let Some(existing) = map.get_mut(&name) {
        match existing {
            Value::Array(items) => items.push(child),
            _ => {
                let old = existing.take();
                *existing = Value::Array(vec![old, child]);
            }
        }
    } else {
        map.insert(name, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_json_family() {
        assert_eq!(classify("application/json").unwrap(), BodyFormat::Json);
        assert_eq!(
            classify("application/json; charset=utf-8").unwrap(),
            BodyFormat::Json
        );
        assert_eq!(classify("text/javascript").unwrap(), BodyFormat::Json);
    }

    #[test]
    fn test_classify_xml_family() {
        assert_eq!(classify("application/xml").unwrap(), BodyFormat::Xml);
        assert_eq!(classify("application/atom+xml").unwrap(), BodyFormat::Xml);
        assert_eq!(classify("application/rss+xml").unwrap(), BodyFormat::Xml);
    }

    #[test]
    fn test_classify_unknown_is_config_error() {
        let err = classify("text/plain").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownContentType(t) if t == "text/plain"));
    }

    #[test]
    fn test_decode_json_body() {
        let value = decode_body("application/json", r#"[{"id": 1}]"#).unwrap();
        assert_eq!(value, json!([{"id": 1}]));
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode_body("application/json", "{nope").unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_xml_simple_document() {
        let value = xml_to_value("<user><id>1</id><name>sam</name></user>").unwrap();
        assert_eq!(value, json!({"user": {"id": "1", "name": "sam"}}));
    }

    #[test]
    fn test_xml_repeated_siblings_become_array() {
        let value =
            xml_to_value("<list><item>a</item><item>b</item><item>c</item></list>").unwrap();
        assert_eq!(value, json!({"list": {"item": ["a", "b", "c"]}}));
    }

    #[test]
    fn test_xml_attributes_and_text() {
        let value = xml_to_value(r#"<doc><entry lang="en">hello</entry></doc>"#).unwrap();
        assert_eq!(
            value,
            json!({"doc": {"entry": {"@lang": "en", "#text": "hello"}}})
        );
    }

    #[test]
    fn test_xml_empty_element() {
        let value = xml_to_value(r#"<doc><flag/><tag v="1"/></doc>"#).unwrap();
        assert_eq!(value, json!({"doc": {"flag": null, "tag": {"@v": "1"}}}));
    }
}

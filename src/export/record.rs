//! Values that travel through the export pipeline

use std::fmt;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde_json::Value;
use serde_json::value::RawValue;

use crate::error::FetchError;

/// One search hit as returned by the index.
///
/// Every member (`_index`, `_id`, `_source`, `sort`, ...) is kept as the raw
/// JSON text the server sent, in server order, duplicates included. The
/// pipeline never interprets them, so numbers and strings reach the output
/// byte for byte.
#[derive(Debug, Clone)]
pub struct Hit {
    fields: Vec<(String, Box<RawValue>)>,
}

impl Hit {
    /// Parse a single hit object
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Raw value of the first member called `name`
    pub fn field(&self, name: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_ref())
    }

    /// Document id, when present as a string
    pub fn id(&self) -> Option<String> {
        self.field("_id")
            .and_then(|raw| serde_json::from_str::<String>(raw.get()).ok())
    }

    pub fn source(&self) -> Option<&RawValue> {
        self.field("_source")
    }

    /// Serialize to the compact single-line form written to the sink
    ///
    /// Members whose value is `null` are left out.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let size: usize = self.fields.iter().map(|(k, v)| k.len() + v.get().len() + 4).sum();
        let mut line = Vec::with_capacity(size);
        line.push(b'{');
        let mut first = true;
        for (key, value) in &self.fields {
            if value.get().trim() == "null" {
                continue;
            }
            if !first {
                line.push(b',');
            }
            first = false;
            serde_json::to_writer(&mut line, key)?;
            line.push(b':');
            push_compact(&mut line, value.get());
        }
        line.push(b'}');
        Ok(line)
    }
}

/// Append `json` without insignificant whitespace; tokens are copied as is
fn push_compact(out: &mut Vec<u8>, json: &str) {
    let mut in_string = false;
    let mut escaped = false;
    for &byte in json.as_bytes() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else if byte == b'"' {
            in_string = true;
        } else if matches!(byte, b' ' | b'\t' | b'\n' | b'\r') {
            continue;
        }
        out.push(byte);
    }
}

impl<'de> Deserialize<'de> for Hit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HitVisitor;

        impl<'de> Visitor<'de> for HitVisitor {
            type Value = Hit;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a search hit object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Hit, A::Error> {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(4));
                while let Some(key) = map.next_key::<String>()? {
                    let value: Box<RawValue> = map.next_value()?;
                    fields.push((key, value));
                }
                Ok(Hit { fields })
            }
        }

        deserializer.deserialize_map(HitVisitor)
    }
}

/// One pagination step worth of hits, in server order
pub type Page = Vec<Hit>;

/// Query fragment passed verbatim as the `query` of the search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(String);

impl Filter {
    pub const MATCH_ALL: &'static str = r#"{"match_all":{}}"#;

    /// Wrap a raw query; blank input means match everything
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.trim().is_empty() {
            Self(Self::MATCH_ALL.to_string())
        } else {
            Self(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_match_all(&self) -> bool {
        self.0 == Self::MATCH_ALL
    }

    /// Parse into the JSON value embedded in the request body
    pub fn to_query(&self) -> Result<Value, FetchError> {
        serde_json::from_str(&self.0).map_err(|e| FetchError::InvalidFilter(format!("{e}: {}", self.0)))
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self(Self::MATCH_ALL.to_string())
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_passes_metadata_through() {
        let raw = r#"{"_index":"logs","_id":"a1","_score":1.5,"_routing":"r7","_source":{"msg":"hi","n":3}}"#;
        let hit = Hit::from_json(raw).unwrap();
        assert_eq!(hit.id().as_deref(), Some("a1"));
        assert_eq!(hit.field("_routing").map(RawValue::get), Some(r#""r7""#));

        let line = String::from_utf8(hit.to_line().unwrap()).unwrap();
        assert_eq!(line, raw);
    }

    #[test]
    fn test_null_score_is_omitted() {
        let hit = Hit::from_json(r#"{"_index":"logs","_id":"b","_score":null,"_source":{},"sort":[4]}"#).unwrap();
        let line = String::from_utf8(hit.to_line().unwrap()).unwrap();
        assert_eq!(line, r#"{"_index":"logs","_id":"b","_source":{},"sort":[4]}"#);
    }

    #[test]
    fn test_source_numbers_and_duplicates_untouched() {
        let raw = r#"{"_id":"n","_score":1.0,"_source":{"big":12345678901234567890123,"price":1.10,"e":1e2,"k":1,"k":2}}"#;
        let line = Hit::from_json(raw).unwrap().to_line().unwrap();
        assert_eq!(String::from_utf8(line).unwrap(), raw);
    }

    #[test]
    fn test_pretty_printed_hit_becomes_one_line() {
        let raw = "{\n  \"_id\" : \"p\",\n  \"_source\" : {\n    \"msg\" : \"a b\\\" c\",\n    \"v\" : 2.50\n  }\n}";
        let line = String::from_utf8(Hit::from_json(raw).unwrap().to_line().unwrap()).unwrap();
        assert_eq!(line, r#"{"_id":"p","_source":{"msg":"a b\" c","v":2.50}}"#);
    }

    #[test]
    fn test_rejects_non_object_hit() {
        assert!(Hit::from_json("[1,2]").is_err());
    }

    #[test]
    fn test_filter_defaults_to_match_all() {
        assert!(Filter::new("").is_match_all());
        assert!(Filter::new("   ").is_match_all());
        assert!(Filter::default().is_match_all());
        let f = Filter::new(r#"{"range":{"timestamp":{"gte":"2021-04-20"}}}"#);
        assert!(!f.is_match_all());
        assert!(f.to_query().unwrap().get("range").is_some());
    }

    #[test]
    fn test_filter_rejects_invalid_json() {
        let err = Filter::new("{match_all").to_query().unwrap_err();
        assert!(matches!(err, FetchError::InvalidFilter(_)));
    }
}

//! Mapping of decoded JSON documents onto `Message`.
//!
//! Every known field is looked up once and classified as absent, present with
//! the expected type, or present with some other type. String fields refuse a
//! mismatch, numeric fields fall back to zero.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, Message};

#[derive(Debug, PartialEq)]
enum Field<T> {
    /// Missing or null.
    Absent,
    Present(T),
    Mismatch,
}

impl<T> Field<T> {
    /// Resolve a strictly typed field, a mismatch is an error.
    fn strict(self, field: &'static str, expected: &'static str) -> Result<Option<T>, Error> {
        match self {
            Field::Absent => Ok(None),
            Field::Present(value) => Ok(Some(value)),
            Field::Mismatch => Err(Error::TypeMismatch { field, expected }),
        }
    }

    /// Resolve a leniently typed field, a mismatch counts as absent.
    fn lenient(self) -> Option<T> {
        match self {
            Field::Present(value) => Some(value),
            Field::Absent | Field::Mismatch => None,
        }
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn string_field<'a>(map: &'a Map<String, Value>, key: &str) -> Field<&'a str> {
    match lookup(map, key) {
        None => Field::Absent,
        Some(Value::String(s)) => Field::Present(s),
        Some(_) => Field::Mismatch,
    }
}

// timestamps are numbers, but some senders quote them
fn float_field(map: &Map<String, Value>, key: &str) -> Field<f64> {
    match lookup(map, key) {
        None => Field::Absent,
        Some(Value::Number(n)) => n.as_f64().map_or(Field::Mismatch, Field::Present),
        Some(Value::String(s)) => s.parse::<f64>().map_or(Field::Mismatch, Field::Present),
        Some(_) => Field::Mismatch,
    }
}

fn int_field(map: &Map<String, Value>, key: &str) -> Field<i32> {
    match lookup(map, key) {
        None => Field::Absent,
        Some(Value::Number(n)) => match n.as_f64() {
            // saturates like any float to int cast
            Some(f) => Field::Present(f as i32),
            None => Field::Mismatch,
        },
        Some(_) => Field::Mismatch,
    }
}

fn owned(s: Option<&str>) -> String {
    s.unwrap_or_default().to_string()
}

impl Message {
    /// Build a message from a decoded JSON object.
    ///
    /// Missing fields are never an error. A present field of the wrong type
    /// is an error only for the string fields.
    pub fn from_map(map: Map<String, Value>) -> Result<Message, Error> {
        let version = string_field(&map, "version").strict("version", "string")?;
        let host = string_field(&map, "host").strict("host", "string")?;
        let short = string_field(&map, "short_message").strict("short_message", "string")?;
        let full = string_field(&map, "full_message").strict("full_message", "string")?;
        let facility = string_field(&map, "facility").strict("facility", "string")?;
        let file = string_field(&map, "file").strict("file", "string")?;

        let mut msg = Message {
            version: owned(version),
            host: owned(host),
            short: owned(short),
            full: owned(full),
            time_unix: float_field(&map, "timestamp").lenient().unwrap_or_default(),
            level: int_field(&map, "level").lenient().unwrap_or_default(),
            facility: owned(facility),
            file: owned(file),
            line: int_field(&map, "line").lenient().unwrap_or_default(),
            extra: None,
        };

        let extra = map
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .filter_map(|(key, value)| {
                key.strip_prefix('_')
                    .map(|name| (name.to_string(), value))
            })
            .collect::<Map<String, Value>>();

        if !extra.is_empty() {
            msg.extra = Some(extra);
        }

        Ok(msg)
    }

    /// Decode a JSON payload into a message.
    ///
    /// Only the leading JSON object is read, anything after it (some senders
    /// terminate payloads with a NUL byte) is ignored. Invalid UTF-8, e.g.
    /// Latin-1 text, is replaced with U+FFFD instead of failing the message.
    pub fn from_slice(buf: &[u8]) -> Result<Message, Error> {
        let text = String::from_utf8_lossy(buf);
        let mut de = serde_json::Deserializer::from_str(&text);
        let map = Map::<String, Value>::deserialize(&mut de)?;

        Message::from_map(map)
    }
}

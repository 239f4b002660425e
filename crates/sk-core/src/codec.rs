//! Value encoding
//!
//! Turns any serde value into a tagged byte blob the store can hold, and
//! decodes it back into a caller-chosen type.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{Error, Result};

/// Shape of an encoded value, stored as the first byte of the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Null = 0,
    Bool = 1,
    Number = 2,
    Text = 3,
    List = 4,
    Record = 5,
}

impl ValueKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Null),
            1 => Some(Self::Bool),
            2 => Some(Self::Number),
            3 => Some(Self::Text),
            4 => Some(Self::List),
            5 => Some(Self::Record),
            _ => None,
        }
    }

    /// Classify a JSON value
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(_) => Self::Bool,
            JsonValue::Number(_) => Self::Number,
            JsonValue::String(_) => Self::Text,
            JsonValue::Array(_) => Self::List,
            JsonValue::Object(_) => Self::Record,
        }
    }
}

/// Encoded value: shape tag plus codec payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub kind: ValueKind,
    pub bytes: Vec<u8>,
}

impl Encoded {
    pub fn new(kind: ValueKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    /// Serialize into the raw form written to a store
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.bytes.len() + 1);
        raw.push(self.kind as u8);
        raw.extend_from_slice(&self.bytes);
        raw
    }

    /// Parse the raw form read from a store
    ///
    /// Empty input means nothing was stored and yields `Error::NotFound`.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let (&tag, payload) = raw
            .split_first()
            .ok_or_else(|| Error::NotFound("empty value".to_string()))?;

        let kind = ValueKind::from_tag(tag)
            .ok_or_else(|| Error::Decode(format!("unknown value tag: {}", tag)))?;

        Ok(Self::new(kind, payload.to_vec()))
    }

    pub fn is_text(&self) -> bool {
        self.kind == ValueKind::Text
    }
}

/// Codec trait
///
/// Implementations must round-trip strings (including multi-byte and
/// markup-bearing text), primitives and field-labelled records.
pub trait Codec: Send + Sync + 'static {
    /// Encode a value into a tagged blob
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Encoded>;

    /// Decode a tagged blob into the requested type
    fn decode<T: DeserializeOwned>(&self, encoded: &Encoded) -> Result<T>;
}

/// JSON codec backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Encoded> {
        let json = serde_json::to_value(value).map_err(|e| Error::Encode(e.to_string()))?;
        let kind = ValueKind::of(&json);
        let bytes = serde_json::to_vec(&json).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(Encoded::new(kind, bytes))
    }

    fn decode<T: DeserializeOwned>(&self, encoded: &Encoded) -> Result<T> {
        if encoded.bytes.is_empty() {
            return Err(Error::NotFound("empty payload".to_string()));
        }
        serde_json::from_slice(&encoded.bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

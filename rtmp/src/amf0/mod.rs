mod decoding;
mod encoding;

pub(crate) use decoding::decode_amf0_values;
pub(crate) use encoding::encode_amf0_values;

use std::collections::HashMap;

/// A value in the AMF0 wire format used by RTMP command and data messages.
///
/// Only the subset of AMF0 needed for the `connect` / `createStream` / `publish`
/// handshake and status events is implemented; object property order is not
/// preserved since RTMP peers identify properties by key, not position.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(HashMap<String, Amf0Value>),
    Null,
    Undefined,
    EcmaArray(HashMap<String, Amf0Value>),
}

impl Amf0Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn object_get(&self, key: &str) -> Option<&Amf0Value> {
        match self {
            Amf0Value::Object(map) | Amf0Value::EcmaArray(map) => map.get(key),
            _ => None,
        }
    }
}

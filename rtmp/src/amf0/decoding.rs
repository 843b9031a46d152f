use bytes::{Buf, Bytes};
use std::collections::HashMap;

use crate::amf0::Amf0Value;
use crate::error::AmfError;

const OBJECT_END_MARKER: [u8; 3] = [0x00, 0x00, 0x09];

pub(crate) fn decode_amf0_values(payload: &[u8]) -> Result<Vec<Amf0Value>, AmfError> {
    let mut buf = Bytes::copy_from_slice(payload);
    let mut values = Vec::new();
    while buf.has_remaining() {
        let (value, rest) = decode_value(buf)?;
        values.push(value);
        buf = rest;
    }
    Ok(values)
}

fn decode_value(mut buf: Bytes) -> Result<(Amf0Value, Bytes), AmfError> {
    if !buf.has_remaining() {
        return Err(AmfError::InsufficientData);
    }
    let marker = buf.get_u8();
    match marker {
        0x00 => {
            if buf.remaining() < 8 {
                return Err(AmfError::InsufficientData);
            }
            Ok((Amf0Value::Number(buf.get_f64()), buf))
        }
        0x01 => {
            if buf.remaining() < 1 {
                return Err(AmfError::InsufficientData);
            }
            Ok((Amf0Value::Boolean(buf.get_u8() == 1), buf))
        }
        0x02 => {
            let (s, rest) = decode_string(buf)?;
            Ok((Amf0Value::String(s), rest))
        }
        0x03 => {
            let (pairs, rest) = decode_pairs(buf)?;
            Ok((Amf0Value::Object(pairs), rest))
        }
        0x05 => Ok((Amf0Value::Null, buf)),
        0x06 => Ok((Amf0Value::Undefined, buf)),
        0x08 => {
            if buf.remaining() < 4 {
                return Err(AmfError::InsufficientData);
            }
            let _count = buf.get_u32();
            let (pairs, rest) = decode_pairs(buf)?;
            Ok((Amf0Value::EcmaArray(pairs), rest))
        }
        other => Err(AmfError::UnknownMarker(other)),
    }
}

fn decode_string(mut buf: Bytes) -> Result<(String, Bytes), AmfError> {
    if buf.remaining() < 2 {
        return Err(AmfError::InsufficientData);
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(AmfError::InsufficientData);
    }
    let bytes = buf.copy_to_bytes(len);
    let s = String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)?;
    Ok((s, buf))
}

fn decode_pairs(mut buf: Bytes) -> Result<(HashMap<String, Amf0Value>, Bytes), AmfError> {
    let mut pairs = HashMap::new();
    loop {
        if buf.remaining() < 3 {
            return Err(AmfError::InsufficientData);
        }
        if buf[..3] == OBJECT_END_MARKER {
            buf.advance(3);
            return Ok((pairs, buf));
        }
        let (key, rest) = decode_string(buf)?;
        let (value, rest) = decode_value(rest)?;
        pairs.insert(key, value);
        buf = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_command_reply() {
        use crate::amf0::encode_amf0_values;

        let mut object = HashMap::new();
        object.insert("level".to_string(), Amf0Value::String("status".into()));
        object.insert("code".to_string(), Amf0Value::Number(200.0));

        let values = vec![
            Amf0Value::String("_result".into()),
            Amf0Value::Number(1.0),
            Amf0Value::Null,
            Amf0Value::Object(object),
        ];

        let encoded = encode_amf0_values(&values).unwrap();
        let decoded = decode_amf0_values(&encoded).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0].as_str(), Some("_result"));
        assert_eq!(decoded[1].as_f64(), Some(1.0));
        assert_eq!(
            decoded[3].object_get("code").and_then(|v| v.as_f64()),
            Some(200.0)
        );
    }

    #[test]
    fn rejects_truncated_string() {
        let bytes = [0x02, 0x00, 0x05, b'h', b'i'];
        assert!(matches!(
            decode_amf0_values(&bytes),
            Err(AmfError::InsufficientData)
        ));
    }
}

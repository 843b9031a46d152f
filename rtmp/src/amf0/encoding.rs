use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;

use crate::amf0::Amf0Value;
use crate::error::AmfError;

const NUMBER: u8 = 0x00;
const BOOLEAN: u8 = 0x01;
const STRING: u8 = 0x02;
const OBJECT: u8 = 0x03;
const NULL: u8 = 0x05;
const UNDEFINED: u8 = 0x06;
const ECMA_ARRAY: u8 = 0x08;
const OBJECT_END: [u8; 3] = [0x00, 0x00, 0x09];

pub(crate) fn encode_amf0_values(values: &[Amf0Value]) -> Result<Bytes, AmfError> {
    let mut buf = BytesMut::new();
    for value in values {
        encode_value(&mut buf, value)?;
    }
    Ok(buf.freeze())
}

fn encode_value(buf: &mut BytesMut, value: &Amf0Value) -> Result<(), AmfError> {
    match value {
        Amf0Value::Number(n) => {
            buf.put_u8(NUMBER);
            buf.put_f64(*n);
        }
        Amf0Value::Boolean(b) => {
            buf.put_u8(BOOLEAN);
            buf.put_u8((*b).into());
        }
        Amf0Value::String(s) => encode_string(buf, s)?,
        Amf0Value::Object(map) => {
            buf.put_u8(OBJECT);
            encode_pairs(buf, map)?;
        }
        Amf0Value::Null => buf.put_u8(NULL),
        Amf0Value::Undefined => buf.put_u8(UNDEFINED),
        Amf0Value::EcmaArray(map) => {
            buf.put_u8(ECMA_ARRAY);
            buf.put_u32(map.len() as u32);
            encode_pairs(buf, map)?;
        }
    }
    Ok(())
}

fn encode_string(buf: &mut BytesMut, s: &str) -> Result<(), AmfError> {
    if s.len() > u16::MAX as usize {
        return Err(AmfError::StringTooLong(s.len()));
    }
    buf.put_u8(STRING);
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn encode_pairs(buf: &mut BytesMut, map: &HashMap<String, Amf0Value>) -> Result<(), AmfError> {
    for (key, value) in map {
        if key.len() > u16::MAX as usize {
            return Err(AmfError::StringTooLong(key.len()));
        }
        buf.put_u16(key.len() as u16);
        buf.put_slice(key.as_bytes());
        encode_value(buf, value)?;
    }
    buf.put_slice(&OBJECT_END);
    Ok(())
}

use std::{collections::HashMap, io::Read};

use bytes::{Bytes, BytesMut};

use crate::{error::RtmpError, protocol::MessageType};

#[derive(Debug)]
pub(crate) struct RawMessage {
    pub msg_type: MessageType,
    pub stream_id: u32,
    pub payload: Bytes,
}

#[derive(Clone, Copy, Default)]
struct ChunkStreamState {
    timestamp: u32,
    msg_len: usize,
    msg_type: Option<MessageType>,
    stream_id: u32,
}

/// Reassembles RTMP chunk-stream frames back into whole messages.
///
/// Handles chunk headers of type 0-3 (full header, same-stream, same-length,
/// continuation) since a compliant server may use any of them once a chunk
/// stream is established, even though our own writer only ever emits 0 and 3.
pub(crate) struct RtmpMessageReader<S> {
    stream: S,
    chunk_size: usize,
    cs_state: HashMap<u32, ChunkStreamState>,
    partial: HashMap<u32, BytesMut>,
}

impl<S: Read> RtmpMessageReader<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            chunk_size: 128,
            cs_state: HashMap::new(),
            partial: HashMap::new(),
        }
    }

    pub(crate) fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }

    /// Reads chunks off the wire until one full message has been reassembled.
    pub(crate) fn read_message(&mut self) -> Result<RawMessage, RtmpError> {
        loop {
            let (cs_id, fmt) = self.read_basic_header()?;

            match fmt {
                0 => {
                    let timestamp = self.read_u24_be()?;
                    let msg_len = self.read_u24_be()? as usize;
                    let msg_type = MessageType::from_raw(self.read_u8()?);
                    let stream_id = self.read_u32_le()?;
                    let state = self.cs_state.entry(cs_id).or_default();
                    state.timestamp = timestamp;
                    state.msg_len = msg_len;
                    state.msg_type = msg_type;
                    state.stream_id = stream_id;
                }
                1 => {
                    let delta = self.read_u24_be()?;
                    let msg_len = self.read_u24_be()? as usize;
                    let msg_type = MessageType::from_raw(self.read_u8()?);
                    let state = self.cs_state.entry(cs_id).or_default();
                    state.msg_len = msg_len;
                    state.msg_type = msg_type;
                    state.timestamp = state.timestamp.wrapping_add(delta);
                }
                2 => {
                    let delta = self.read_u24_be()?;
                    let state = self.cs_state.entry(cs_id).or_default();
                    state.timestamp = state.timestamp.wrapping_add(delta);
                }
                3 => {
                    self.cs_state.entry(cs_id).or_default();
                }
                _ => unreachable!("2-bit field"),
            }

            let state = *self.cs_state.get(&cs_id).expect("state inserted above");
            let msg_type = state.msg_type.ok_or(RtmpError::HandshakeFailed(
                "received chunk for unknown message type".into(),
            ))?;

            let buf = self.partial.entry(cs_id).or_insert_with(BytesMut::new);
            let remaining = state.msg_len - buf.len();
            let read_len = remaining.min(self.chunk_size);
            let mut chunk = vec![0u8; read_len];
            self.stream.read_exact(&mut chunk)?;
            buf.extend_from_slice(&chunk);

            if buf.len() == state.msg_len {
                let payload = self.partial.remove(&cs_id).unwrap_or_default().freeze();
                return Ok(RawMessage {
                    msg_type,
                    stream_id: state.stream_id,
                    payload,
                });
            }
        }
    }

    fn read_basic_header(&mut self) -> Result<(u32, u8), RtmpError> {
        let first = self.read_u8()?;
        let fmt = (first & 0xC0) >> 6;
        let cs_id = match first & 0x3F {
            0 => 64 + self.read_u8()? as u32,
            1 => {
                let b1 = self.read_u8()? as u32;
                let b2 = self.read_u8()? as u32;
                64 + b1 + b2 * 256
            }
            id => id as u32,
        };
        Ok((cs_id, fmt))
    }

    fn read_u8(&mut self) -> Result<u8, RtmpError> {
        let mut b = [0u8; 1];
        self.stream.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_u24_be(&mut self) -> Result<u32, RtmpError> {
        let mut b = [0u8; 3];
        self.stream.read_exact(&mut b)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    fn read_u32_le(&mut self) -> Result<u32, RtmpError> {
        let mut b = [0u8; 4];
        self.stream.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }
}

use std::{cmp::min, io::Write, net::TcpStream};

use crate::{error::RtmpError, message::RtmpMessage};

/// Writes `RtmpMessage`s to a socket, splitting them into chunk-stream frames.
///
/// Only chunk type 0 (full header, used for the first chunk of a message) and
/// chunk type 3 (continuation, no header) are ever emitted: a publishing client
/// never needs to reference a previous chunk's header the way type 1/2 do.
pub(crate) struct RtmpMessageWriter {
    stream: TcpStream,
    chunk_size: usize,
}

impl RtmpMessageWriter {
    pub(crate) fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            chunk_size: 128,
        }
    }

    pub(crate) fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }

    pub(crate) fn write(&mut self, msg: &RtmpMessage) -> Result<(), RtmpError> {
        let cs_id = msg.msg_type.chunk_stream_id();
        let total_len = msg.payload.len();
        let mut offset = 0;

        while offset < total_len || (offset == 0 && total_len == 0) {
            let chunk_len = min(self.chunk_size, total_len - offset);

            if offset == 0 {
                self.stream.write_all(&[cs_id & 0x3F])?;
                self.write_u24_be(msg.timestamp)?;
                self.write_u24_be(total_len as u32)?;
                self.stream.write_all(&[msg.msg_type.into_raw()])?;
                self.write_u32_le(msg.stream_id)?;
            } else {
                self.stream.write_all(&[0xC0 | (cs_id & 0x3F)])?;
            }

            self.stream
                .write_all(&msg.payload[offset..offset + chunk_len])?;
            offset += chunk_len;

            if total_len == 0 {
                break;
            }
        }

        self.stream.flush()?;
        Ok(())
    }

    pub(crate) fn try_clone(&self) -> Result<TcpStream, RtmpError> {
        Ok(self.stream.try_clone()?)
    }

    fn write_u24_be(&mut self, val: u32) -> Result<(), RtmpError> {
        let bytes = val.to_be_bytes();
        self.stream.write_all(&bytes[1..4])?;
        Ok(())
    }

    fn write_u32_le(&mut self, val: u32) -> Result<(), RtmpError> {
        self.stream.write_all(&val.to_le_bytes())?;
        Ok(())
    }
}

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RtmpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid RTMP version: {0}")]
    InvalidVersion(u8),

    #[error("handshake failed: {0}")]
    HandshakeFailed(Arc<str>),

    #[error("connection timed out")]
    Timeout,

    #[error("stream not registered, publish() was never called")]
    StreamNotRegistered,

    #[error("server rejected publish request: {0}")]
    PublishRejected(Arc<str>),

    #[error("malformed AMF0 data: {0}")]
    Amf(#[from] AmfError),

    #[error("connection closed by peer")]
    ConnectionClosed,
}

#[derive(Error, Debug)]
pub enum AmfError {
    #[error("unknown AMF0 marker: {0:#04x}")]
    UnknownMarker(u8),

    #[error("insufficient data decoding AMF0 value")]
    InsufficientData,

    #[error("invalid UTF-8 string in AMF0 value")]
    InvalidUtf8,

    #[error("string too long to encode as AMF0: {0} bytes")]
    StringTooLong(usize),
}

use bytes::Bytes;

use crate::protocol::MessageType;

/// A single RTMP message before it is split into chunks for the wire.
#[derive(Debug)]
pub(crate) struct RtmpMessage {
    pub msg_type: MessageType,
    pub stream_id: u32,
    pub timestamp: u32,
    pub payload: Bytes,
}

impl RtmpMessage {
    pub(crate) fn command(stream_id: u32, payload: Bytes) -> Self {
        Self {
            msg_type: MessageType::CommandMessageAmf0,
            stream_id,
            timestamp: 0,
            payload,
        }
    }

    pub(crate) fn video(stream_id: u32, timestamp: u32, payload: Bytes) -> Self {
        Self {
            msg_type: MessageType::Video,
            stream_id,
            timestamp,
            payload,
        }
    }

    pub(crate) fn audio(stream_id: u32, timestamp: u32, payload: Bytes) -> Self {
        Self {
            msg_type: MessageType::Audio,
            stream_id,
            timestamp,
            payload,
        }
    }
}

mod message_reader;
mod message_writer;

pub(crate) use message_reader::RtmpMessageReader;
pub(crate) use message_writer::RtmpMessageWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageType {
    // https://rtmp.veriskope.com/docs/spec/#54-protocol-control-messages
    SetChunkSize,
    WindowAckSize,
    SetPeerBandwidth,
    Audio,
    Video,
    CommandMessageAmf0,
}

impl MessageType {
    pub(crate) fn into_raw(self) -> u8 {
        match self {
            MessageType::SetChunkSize => 1,
            MessageType::WindowAckSize => 5,
            MessageType::SetPeerBandwidth => 6,
            MessageType::Audio => 8,
            MessageType::Video => 9,
            MessageType::CommandMessageAmf0 => 20,
        }
    }

    pub(crate) fn from_raw(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageType::SetChunkSize),
            5 => Some(MessageType::WindowAckSize),
            6 => Some(MessageType::SetPeerBandwidth),
            8 => Some(MessageType::Audio),
            9 => Some(MessageType::Video),
            20 => Some(MessageType::CommandMessageAmf0),
            _ => None,
        }
    }

    /// Chunk stream ID conventionally used for messages of this type.
    pub(crate) fn chunk_stream_id(self) -> u8 {
        match self {
            MessageType::SetChunkSize
            | MessageType::WindowAckSize
            | MessageType::SetPeerBandwidth => 2,
            MessageType::CommandMessageAmf0 => 3,
            MessageType::Audio => 4,
            MessageType::Video => 5,
        }
    }
}

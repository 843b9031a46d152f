use bytes::{BufMut, Bytes, BytesMut};

use crate::flv::PacketType;

/// FLV `VIDEODATA` tag body, restricted to the H.264 codec.
///
/// See https://veovera.org/docs/legacy/video-file-format-v10-1-spec.pdf#page=74
#[derive(Debug, Clone)]
pub(crate) struct VideoTag {
    pub packet_type: PacketType,
    /// Composition time offset in milliseconds; only meaningful for `PacketType::Data`.
    pub composition_time: i32,
    pub frame_type: VideoFrameType,
    pub data: Bytes,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    #[default]
    Keyframe,
    Interframe,
}

const CODEC_ID_H264: u8 = 7;

impl VideoTag {
    pub(crate) fn serialize(&self) -> Bytes {
        let frame_type: u8 = match self.frame_type {
            VideoFrameType::Keyframe => 1,
            VideoFrameType::Interframe => 2,
        };
        let first_byte = (frame_type << 4) | CODEC_ID_H264;

        let mut buf = BytesMut::with_capacity(self.data.len() + 5);
        buf.put_u8(first_byte);
        match self.packet_type {
            PacketType::Config => {
                buf.put_u8(0);
                buf.put_slice(&[0, 0, 0]);
            }
            PacketType::Data => {
                buf.put_u8(1);
                buf.put_slice(&self.composition_time.to_be_bytes()[1..4]);
            }
        }
        buf.put_slice(&self.data);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_config_tag_header() {
        let tag = VideoTag {
            packet_type: PacketType::Config,
            composition_time: 0,
            frame_type: VideoFrameType::Keyframe,
            data: Bytes::from_static(&[0xAA, 0xBB]),
        };
        let out = tag.serialize();
        assert_eq!(&out[..5], &[0x17, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&out[5..], &[0xAA, 0xBB]);
    }

    #[test]
    fn serializes_data_tag_with_composition_time() {
        let tag = VideoTag {
            packet_type: PacketType::Data,
            composition_time: 512,
            frame_type: VideoFrameType::Interframe,
            data: Bytes::from_static(&[0x01]),
        };
        let out = tag.serialize();
        assert_eq!(out[0], (2 << 4) | CODEC_ID_H264);
        assert_eq!(out[1], 1);
        assert_eq!(&out[2..5], &512i32.to_be_bytes()[1..4]);
    }
}

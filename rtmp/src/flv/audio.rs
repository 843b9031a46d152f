use bytes::{BufMut, Bytes, BytesMut};

use crate::flv::PacketType;

/// FLV `AUDIODATA` tag body, restricted to the AAC codec.
///
/// See https://veovera.org/docs/legacy/video-file-format-v10-1-spec.pdf#page=74
#[derive(Debug, Clone)]
pub(crate) struct AudioTag {
    pub packet_type: PacketType,
    pub channels: AudioChannels,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioChannels {
    Mono,
    Stereo,
}

const SOUND_FORMAT_AAC: u8 = 10;

impl AudioTag {
    pub(crate) fn serialize(&self) -> Bytes {
        let sound_type: u8 = match self.channels {
            AudioChannels::Mono => 0,
            AudioChannels::Stereo => 1,
        };
        // AAC is always carried at an assumed 44.1kHz/16-bit placeholder rate;
        // the real sample rate lives in the AudioSpecificConfig payload.
        let sound_rate: u8 = 3;
        let sample_size: u8 = 1;
        let first_byte =
            (SOUND_FORMAT_AAC << 4) | (sound_rate << 2) | (sample_size << 1) | sound_type;

        let mut buf = BytesMut::with_capacity(self.data.len() + 2);
        buf.put_u8(first_byte);
        match self.packet_type {
            PacketType::Config => buf.put_u8(0),
            PacketType::Data => buf.put_u8(1),
        }
        buf.put_slice(&self.data);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_config_tag() {
        let tag = AudioTag {
            packet_type: PacketType::Config,
            channels: AudioChannels::Stereo,
            data: Bytes::from_static(&[0x12, 0x10]),
        };
        let out = tag.serialize();
        assert_eq!(out[0], (SOUND_FORMAT_AAC << 4) | (3 << 2) | (1 << 1) | 1);
        assert_eq!(out[1], 0);
        assert_eq!(&out[2..], &[0x12, 0x10]);
    }

    #[test]
    fn serializes_data_tag_mono() {
        let tag = AudioTag {
            packet_type: PacketType::Data,
            channels: AudioChannels::Mono,
            data: Bytes::from_static(&[0xFF]),
        };
        let out = tag.serialize();
        assert_eq!(out[0] & 0x01, 0);
        assert_eq!(out[1], 1);
    }
}

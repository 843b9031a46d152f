use bytes::Bytes;

/// H.264 NAL unit type codes, read from the low 5 bits of the first byte after a start code.
pub mod nal_type {
    pub const NON_IDR_PICTURE: u8 = 1;
    pub const IDR_PICTURE: u8 = 5;
    pub const SEI: u8 = 6;
    pub const SPS: u8 = 7;
    pub const PPS: u8 = 8;
}

/// Presentation/decode timestamp for a video packet. `Derive` and `NotANumber` mirror the
/// sentinel values used at the wire boundary of the original implementation this pool is
/// modeled on, rather than plumbing raw magic integers through the type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timestamp {
    #[default]
    Derive,
    NotANumber,
    Value(i64),
}

/// One H.264 access unit in Annex-B form (NAL units prefixed with `00 00 00 01` start codes).
#[derive(Debug, Clone)]
pub struct VideoPacket {
    pub buffer: Bytes,
    /// Capture-clock presentation time in milliseconds.
    pub time_mills: f64,
    /// Gap to the next packet's `time_mills`, in milliseconds. Unknown until the next
    /// packet arrives; see `LivePacketPool`'s pending-packet slot.
    pub duration: f64,
    pub pts: Timestamp,
    pub dts: Timestamp,
}

impl VideoPacket {
    pub fn new(buffer: Bytes, time_mills: f64) -> Self {
        Self {
            buffer,
            time_mills,
            duration: 0.0,
            pts: Timestamp::Derive,
            dts: Timestamp::Derive,
        }
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// NAL type of the first NAL unit in the buffer, assuming a 4-byte start code prefix.
    pub fn nal_type(&self) -> Option<u8> {
        self.buffer.get(4).map(|b| b & 0x1F)
    }
}

/// One unit of audio: either a raw PCM chunk from capture or an AAC frame from the encoder.
#[derive(Debug, Clone)]
pub enum AudioPayload {
    /// Interleaved 16-bit signed samples across all channels.
    Pcm(Vec<i16>),
    /// Raw encoded AAC bytes, no ADTS header (the container carries the ASC once as extradata).
    Aac(Bytes),
}

#[derive(Debug, Clone)]
pub struct AudioPacket {
    pub payload: AudioPayload,
    /// Presentation time in milliseconds since capture start.
    pub position: f64,
    pub frame_num: Option<u64>,
}

impl AudioPacket {
    pub fn pcm(samples: Vec<i16>, position: f64) -> Self {
        Self {
            payload: AudioPayload::Pcm(samples),
            position,
            frame_num: None,
        }
    }

    pub fn aac(data: Bytes, position: f64) -> Self {
        Self {
            payload: AudioPayload::Aac(data),
            position,
            frame_num: None,
        }
    }

    /// Sample count for PCM, byte count for AAC.
    pub fn size(&self) -> usize {
        match &self.payload {
            AudioPayload::Pcm(samples) => samples.len(),
            AudioPayload::Aac(data) => data.len(),
        }
    }

    pub fn as_pcm(&self) -> Option<&[i16]> {
        match &self.payload {
            AudioPayload::Pcm(samples) => Some(samples),
            AudioPayload::Aac(_) => None,
        }
    }

    pub fn into_aac(self) -> Option<Bytes> {
        match self.payload {
            AudioPayload::Aac(data) => Some(data),
            AudioPayload::Pcm(_) => None,
        }
    }
}

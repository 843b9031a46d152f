use rtmp::{AudioChannels as RtmpAudioChannels, RtmpClient, RtmpClientConfig, VideoFrameType};
use tracing::info;

use crate::{
    bitstream::{annex_b_to_avcc, build_avc_decoder_configuration_record, parse_sequence_header},
    error::PublisherError,
    packet::{AudioPacket, VideoPacket, nal_type},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// TCP connected and RTMP publish negotiated, but no media sent yet.
    Connected,
    /// The AVC sequence header has been written; subsequent video packets are frames.
    Publishing,
    Stopped,
}

/// Drives one RTMP publish session: negotiates the connection, then turns the first
/// video packet it sees into the AVC sequence header (its SPS/PPS are folded into
/// `AVCDecoderConfigurationRecord` extradata and never forwarded as a frame themselves,
/// matching how the container's own muxer re-derives SPS/PPS from extradata) and every
/// packet after that into FLV tags on the wire.
pub struct Publisher {
    client: RtmpClient,
    state: State,
    start_time_mills: Option<f64>,
    video_header_sent: bool,
    audio_header_sent: bool,
}

impl Publisher {
    pub fn connect(config: RtmpClientConfig) -> Result<Self, PublisherError> {
        let client = RtmpClient::connect(config)?;
        info!("RTMP publish session established");
        Ok(Self {
            client,
            state: State::Connected,
            start_time_mills: None,
            video_header_sent: false,
            audio_header_sent: false,
        })
    }

    pub fn send_audio_config(
        &mut self,
        audio_specific_config: bytes::Bytes,
    ) -> Result<(), PublisherError> {
        self.client.send_audio_config(audio_specific_config)?;
        self.audio_header_sent = true;
        Ok(())
    }

    pub fn write_video_frame(&mut self, pkt: &VideoPacket) -> Result<(), PublisherError> {
        if self.state == State::Stopped {
            return Err(PublisherError::MalformedSequenceHeader(
                "publisher already stopped",
            ));
        }

        if !self.video_header_sent {
            let header = parse_sequence_header(&pkt.buffer).ok_or(
                PublisherError::MalformedSequenceHeader(
                    "first video packet did not contain both SPS and PPS",
                ),
            )?;
            let avc_config = build_avc_decoder_configuration_record(&header);
            self.client.send_video_config(avc_config)?;
            self.video_header_sent = true;
            self.state = State::Publishing;
            return Ok(());
        }

        let timestamp_ms = self.relative_timestamp(pkt.time_mills);
        let frame_type = if pkt.nal_type() == Some(nal_type::IDR_PICTURE) {
            VideoFrameType::Keyframe
        } else {
            VideoFrameType::Interframe
        };
        let avcc = annex_b_to_avcc(&pkt.buffer);
        self.client.send_video(timestamp_ms, 0, frame_type, avcc)?;
        Ok(())
    }

    pub fn write_audio_frame(&mut self, pkt: &AudioPacket) -> Result<(), PublisherError> {
        if self.state == State::Stopped {
            return Err(PublisherError::MalformedSequenceHeader(
                "publisher already stopped",
            ));
        }
        if !self.audio_header_sent {
            return Err(PublisherError::MalformedSequenceHeader(
                "audio sequence header must be sent before the first audio frame",
            ));
        }
        let Some(data) = pkt.clone().into_aac() else {
            return Ok(());
        };
        let timestamp_ms = self.relative_timestamp(pkt.position);
        self.client
            .send_audio(timestamp_ms, RtmpAudioChannels::Stereo, data)?;
        Ok(())
    }

    /// The first packet handed to the publisher defines t=0; every timestamp after that
    /// is relative to it so the wire clock starts at zero regardless of capture uptime.
    fn relative_timestamp(&mut self, time_mills: f64) -> u32 {
        let start = *self.start_time_mills.get_or_insert(time_mills);
        (time_mills - start).max(0.0) as u32
    }

    pub fn stop(&mut self) {
        self.state = State::Stopped;
    }
}

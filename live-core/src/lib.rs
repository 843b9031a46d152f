mod aac_pool;
mod audio_encoder;
mod bitstream;
mod consumer;
mod error;
mod listener;
mod packet;
mod packet_pool;
mod publisher;
mod queue;
mod thread_utils;

pub use aac_pool::AacPacketPool;
pub use audio_encoder::{
    AudioEncoderAdapter, AudioEncoderAdapterOptions, FdkAacConfig, FdkAacEncoder,
};
pub use bitstream::{
    SequenceHeader, annex_b_to_avcc, build_audio_specific_config,
    build_avc_decoder_configuration_record, find_start_code, parse_sequence_header,
    sample_rate_index,
};
pub use consumer::{ConsumerThread, ConsumerThreadOptions};
pub use error::{
    AUDIO_QUEUE_ABORT, AudioEncoderError, CLIENT_CANCEL_CONNECT, PUBLISH_INVALID_FLAG,
    PublisherError, VIDEO_QUEUE_ABORT,
};
pub use listener::{NoopListener, PublishEventListener};
pub use packet::{AudioPacket, AudioPayload, Timestamp, VideoPacket, nal_type};
pub use packet_pool::{AUDIO_PACKET_DURATION_MS, LivePacketPool, VIDEO_QUEUE_THRESHOLD};
pub use publisher::Publisher;
pub use queue::{GetResult, PacketQueue};
pub use thread_utils::{InitializableThread, ThreadMetadata};

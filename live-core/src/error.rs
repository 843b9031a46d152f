use thiserror::Error;

/// Negative sentinel returned by the queue-abort paths, mirrored verbatim from the
/// external interface so downstream callers can match on the same numeric codes.
pub const AUDIO_QUEUE_ABORT: i32 = -100200;
pub const VIDEO_QUEUE_ABORT: i32 = -100201;
pub const CLIENT_CANCEL_CONNECT: i32 = -100199;
pub const PUBLISH_INVALID_FLAG: i32 = -1;

#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("RTMP transport error: {0}")]
    Rtmp(#[from] rtmp::RtmpError),

    #[error("H.264 sequence header is malformed: {0}")]
    MalformedSequenceHeader(&'static str),

    #[error("audio queue aborted")]
    AudioQueueAborted,

    #[error("video queue aborted")]
    VideoQueueAborted,
}

impl PublisherError {
    /// Matches the taxonomy in the external interface: queue aborts are expected
    /// shutdown signals, not failures, and must not trigger the timeout callback.
    pub fn as_abort_code(&self) -> Option<i32> {
        match self {
            PublisherError::AudioQueueAborted => Some(AUDIO_QUEUE_ABORT),
            PublisherError::VideoQueueAborted => Some(VIDEO_QUEUE_ABORT),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AudioEncoderError {
    #[error("fdk-aac encoder returned error code {0}")]
    Fdk(i32),
}

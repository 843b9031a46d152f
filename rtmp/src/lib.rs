mod amf0;
mod client;
mod error;
mod flv;
mod handshake;
mod message;
mod protocol;

pub use client::{RtmpClient, RtmpClientConfig};
pub use error::RtmpError;
pub use flv::{AudioChannels, VideoFrameType};

use std::{collections::HashMap, io::ErrorKind, net::TcpStream, time::Duration};

use bytes::Bytes;
use tracing::debug;

use crate::{
    amf0::{Amf0Value, decode_amf0_values, encode_amf0_values},
    error::RtmpError,
    flv::{AudioChannels, AudioTag, PacketType, VideoFrameType, VideoTag},
    handshake::ClientHandshake,
    message::RtmpMessage,
    protocol::{MessageType, RtmpMessageReader, RtmpMessageWriter},
};

const DEFAULT_RTMP_PORT: u16 = 1935;
const FLASH_VER: &str = "FMLE/3.0 (compatible; rust-rtmp-publisher)";

#[derive(Debug, Clone)]
pub struct RtmpClientConfig {
    /// `rtmp://host[:port]/app/stream_key`
    pub url: String,
    pub connect_timeout: Duration,
    /// Applied as the socket read/write timeout for the lifetime of the connection;
    /// a stalled publish shows up as an I/O timeout on the next send.
    pub publish_timeout: Duration,
}

/// A connected, publish-ready RTMP session.
///
/// Owns the TCP connection and message stream id assigned by the server during
/// `createStream`; every `send_*` call frames its payload as an FLV tag and
/// writes it as an RTMP `Audio`/`Video` message on that stream.
pub struct RtmpClient {
    writer: RtmpMessageWriter,
    reader: RtmpMessageReader<TcpStream>,
    message_stream_id: u32,
    next_transaction_id: f64,
}

struct ParsedUrl {
    host: String,
    port: u16,
    app: String,
    stream_key: String,
}

fn parse_rtmp_url(url: &str) -> Result<ParsedUrl, RtmpError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| RtmpError::HandshakeFailed(format!("invalid RTMP url: {e}").into()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| RtmpError::HandshakeFailed("RTMP url has no host".into()))?
        .to_string();
    let port = parsed.port().unwrap_or(DEFAULT_RTMP_PORT);
    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| RtmpError::HandshakeFailed("RTMP url has no path".into()))?
        .filter(|s| !s.is_empty());
    let app = segments
        .next()
        .ok_or_else(|| RtmpError::HandshakeFailed("RTMP url is missing the app name".into()))?
        .to_string();
    let stream_key = segments.collect::<Vec<_>>().join("/");
    if stream_key.is_empty() {
        return Err(RtmpError::HandshakeFailed(
            "RTMP url is missing the stream key".into(),
        ));
    }
    Ok(ParsedUrl {
        host,
        port,
        app,
        stream_key,
    })
}

impl RtmpClient {
    pub fn connect(config: RtmpClientConfig) -> Result<Self, RtmpError> {
        let parsed = parse_rtmp_url(&config.url)?;
        let addr = format!("{}:{}", parsed.host, parsed.port);

        let mut stream = TcpStream::connect(&addr)?;
        stream.set_nodelay(true)?;

        ClientHandshake::perform(&mut stream)?;

        stream.set_read_timeout(Some(config.publish_timeout))?;
        stream.set_write_timeout(Some(config.publish_timeout))?;

        let writer = RtmpMessageWriter::new(stream.try_clone()?);
        let reader = RtmpMessageReader::new(stream);

        let mut client = Self {
            writer,
            reader,
            message_stream_id: 0,
            next_transaction_id: 1.0,
        };

        client.negotiate_session(&parsed.app, &parsed.stream_key, &addr)?;
        Ok(client)
    }

    fn negotiate_session(
        &mut self,
        app: &str,
        stream_key: &str,
        addr: &str,
    ) -> Result<(), RtmpError> {
        self.send_connect(app, addr)?;
        self.wait_for_result()?;

        let transaction_id = self.send_create_stream()?;
        self.message_stream_id = self.wait_for_create_stream_result(transaction_id)?;

        self.send_publish(stream_key)?;
        self.wait_for_publish_start()?;
        Ok(())
    }

    fn send_connect(&mut self, app: &str, addr: &str) -> Result<(), RtmpError> {
        let mut command_object = HashMap::new();
        command_object.insert("app".to_string(), Amf0Value::String(app.to_string()));
        command_object.insert(
            "type".to_string(),
            Amf0Value::String("nonprivate".to_string()),
        );
        command_object.insert(
            "flashVer".to_string(),
            Amf0Value::String(FLASH_VER.to_string()),
        );
        command_object.insert(
            "tcUrl".to_string(),
            Amf0Value::String(format!("rtmp://{addr}/{app}")),
        );

        let values = [
            Amf0Value::String("connect".to_string()),
            Amf0Value::Number(self.next_transaction_id),
            Amf0Value::Object(command_object),
        ];
        self.next_transaction_id += 1.0;
        self.send_command(0, &values)
    }

    fn send_create_stream(&mut self) -> Result<f64, RtmpError> {
        let transaction_id = self.next_transaction_id;
        self.next_transaction_id += 1.0;
        let values = [
            Amf0Value::String("createStream".to_string()),
            Amf0Value::Number(transaction_id),
            Amf0Value::Null,
        ];
        self.send_command(0, &values)?;
        Ok(transaction_id)
    }

    fn send_publish(&mut self, stream_key: &str) -> Result<(), RtmpError> {
        let values = [
            Amf0Value::String("publish".to_string()),
            Amf0Value::Number(0.0),
            Amf0Value::Null,
            Amf0Value::String(stream_key.to_string()),
            Amf0Value::String("live".to_string()),
        ];
        self.send_command(self.message_stream_id, &values)
    }

    fn send_command(&mut self, stream_id: u32, values: &[Amf0Value]) -> Result<(), RtmpError> {
        let payload = encode_amf0_values(values)?;
        self.writer.write(&RtmpMessage::command(stream_id, payload))
    }

    fn wait_for_result(&mut self) -> Result<(), RtmpError> {
        loop {
            let raw = self.reader.read_message()?;
            match raw.msg_type {
                MessageType::WindowAckSize | MessageType::SetPeerBandwidth => continue,
                MessageType::SetChunkSize => {
                    if raw.payload.len() >= 4 {
                        let size = u32::from_be_bytes(raw.payload[..4].try_into().unwrap());
                        self.reader.set_chunk_size(size as usize);
                    }
                }
                MessageType::CommandMessageAmf0 => {
                    let values = decode_amf0_values(&raw.payload)?;
                    if values.first().and_then(Amf0Value::as_str) == Some("_result") {
                        return Ok(());
                    }
                    if values.first().and_then(Amf0Value::as_str) == Some("_error") {
                        return Err(RtmpError::PublishRejected(
                            "server returned _error for connect".into(),
                        ));
                    }
                }
                _ => debug!(?raw.msg_type, "ignoring unexpected message during handshake"),
            }
        }
    }

    fn wait_for_create_stream_result(
        &mut self,
        expected_transaction_id: f64,
    ) -> Result<u32, RtmpError> {
        loop {
            let raw = self.reader.read_message()?;
            if raw.msg_type != MessageType::CommandMessageAmf0 {
                continue;
            }
            let values = decode_amf0_values(&raw.payload)?;
            let is_result = values.first().and_then(Amf0Value::as_str) == Some("_result");
            let transaction_id = values.get(1).and_then(Amf0Value::as_f64);
            if is_result && transaction_id == Some(expected_transaction_id) {
                let stream_id = values.get(3).and_then(Amf0Value::as_f64).unwrap_or(1.0);
                return Ok(stream_id as u32);
            }
        }
    }

    fn wait_for_publish_start(&mut self) -> Result<(), RtmpError> {
        loop {
            let raw = self.reader.read_message()?;
            if raw.msg_type != MessageType::CommandMessageAmf0 {
                continue;
            }
            let values = decode_amf0_values(&raw.payload)?;
            if values.first().and_then(Amf0Value::as_str) != Some("onStatus") {
                continue;
            }
            let Some(info) = values.get(3) else { continue };
            let Some(code) = info.object_get("code").and_then(Amf0Value::as_str) else {
                continue;
            };
            if code == "NetStream.Publish.Start" {
                return Ok(());
            }
            if code.contains("Error") || code.contains("Rejected") {
                return Err(RtmpError::PublishRejected(code.into()));
            }
        }
    }

    pub fn send_video_config(&mut self, avc_decoder_config: Bytes) -> Result<(), RtmpError> {
        self.write_video_tag(VideoTag {
            packet_type: PacketType::Config,
            composition_time: 0,
            frame_type: VideoFrameType::Keyframe,
            data: avc_decoder_config,
        })
    }

    pub fn send_audio_config(&mut self, audio_specific_config: Bytes) -> Result<(), RtmpError> {
        self.write_audio_tag(AudioTag {
            packet_type: PacketType::Config,
            channels: AudioChannels::Stereo,
            data: audio_specific_config,
        })
    }

    pub fn send_video(
        &mut self,
        timestamp_ms: u32,
        composition_time_ms: i32,
        frame_type: VideoFrameType,
        avcc_data: Bytes,
    ) -> Result<(), RtmpError> {
        self.write_video_frame(
            timestamp_ms,
            VideoTag {
                packet_type: PacketType::Data,
                composition_time: composition_time_ms,
                frame_type,
                data: avcc_data,
            },
        )
    }

    pub fn send_audio(
        &mut self,
        timestamp_ms: u32,
        channels: AudioChannels,
        aac_data: Bytes,
    ) -> Result<(), RtmpError> {
        self.write_audio_frame(
            timestamp_ms,
            AudioTag {
                packet_type: PacketType::Data,
                channels,
                data: aac_data,
            },
        )
    }

    fn write_video_tag(&mut self, tag: VideoTag) -> Result<(), RtmpError> {
        self.write_video_frame(0, tag)
    }

    fn write_video_frame(&mut self, timestamp_ms: u32, tag: VideoTag) -> Result<(), RtmpError> {
        let payload = tag.serialize();
        let result = self.writer.write(&RtmpMessage::video(
            self.message_stream_id,
            timestamp_ms,
            payload,
        ));
        self.map_io_timeout(result)
    }

    fn write_audio_tag(&mut self, tag: AudioTag) -> Result<(), RtmpError> {
        self.write_audio_frame(0, tag)
    }

    fn write_audio_frame(&mut self, timestamp_ms: u32, tag: AudioTag) -> Result<(), RtmpError> {
        let payload = tag.serialize();
        let result = self.writer.write(&RtmpMessage::audio(
            self.message_stream_id,
            timestamp_ms,
            payload,
        ));
        self.map_io_timeout(result)
    }

    fn map_io_timeout(&self, result: Result<(), RtmpError>) -> Result<(), RtmpError> {
        match result {
            Err(RtmpError::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                Err(RtmpError::Timeout)
            }
            other => other,
        }
    }
}

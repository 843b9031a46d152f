use std::{
    collections::VecDeque,
    mem::{self, MaybeUninit},
    os::raw::{c_int, c_void},
    ptr,
};

use bytes::Bytes;
use fdk_aac_sys as fdk;
use tracing::{error, info};

use crate::{
    aac_pool::AacPacketPool,
    error::AudioEncoderError,
    packet::AudioPacket,
    packet_pool::LivePacketPool,
    queue::GetResult,
    thread_utils::{InitializableThread, ThreadMetadata},
};

/// FDK-AAC encoder. Pushed samples are accumulated in `input_buffer` and drained by
/// `aacEncEncode` one encoder-native frame at a time; `encode` may produce zero, one, or
/// more frames depending on how many full frames are now available.
pub struct FdkAacEncoder {
    encoder: *mut fdk::AACENCODER,
    input_buffer: Vec<i16>,
    output_buffer: Vec<u8>,
}

unsafe impl Send for FdkAacEncoder {}

/// AudioSpecificConfig bytes the encoder negotiated, handed to the publisher once to
/// build the FLV AAC sequence-header tag.
pub struct FdkAacConfig {
    pub extradata: Bytes,
}

impl FdkAacEncoder {
    pub fn new(sample_rate: u32, channels: u32) -> Result<(Self, FdkAacConfig), AudioEncoderError> {
        info!(sample_rate, channels, "initializing FDK AAC encoder");
        let mut encoder = ptr::null_mut();
        let channel_mode = match channels {
            1 => fdk::CHANNEL_MODE_MODE_1 as u32,
            _ => fdk::CHANNEL_MODE_MODE_2 as u32,
        };
        let mut maybe_info = MaybeUninit::uninit();
        let info;

        unsafe {
            check(fdk::aacEncOpen(&mut encoder as *mut _, 0, channels))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_AOT,
                fdk::AUDIO_OBJECT_TYPE_AOT_AAC_LC as u32,
            ))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_BITRATEMODE,
                5,
            ))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_SAMPLERATE,
                sample_rate,
            ))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_TRANSMUX,
                0,
            ))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_SBR_MODE,
                0,
            ))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_CHANNELMODE,
                channel_mode,
            ))?;
            check(fdk::aacEncoder_SetParam(
                encoder,
                fdk::AACENC_PARAM_AACENC_AFTERBURNER,
                1,
            ))?;
            check(fdk::aacEncEncode(
                encoder,
                ptr::null(),
                ptr::null(),
                ptr::null(),
                ptr::null_mut(),
            ))?;
            check(fdk::aacEncInfo(encoder, maybe_info.as_mut_ptr()))?;
            info = maybe_info.assume_init();
        }

        Ok((
            Self {
                encoder,
                input_buffer: Vec::new(),
                output_buffer: vec![0; info.maxOutBufBytes as usize],
            },
            FdkAacConfig {
                extradata: Bytes::copy_from_slice(&info.confBuf[0..(info.confSize as usize)]),
            },
        ))
    }

    pub fn push_samples(&mut self, samples: &[i16]) {
        self.input_buffer.extend_from_slice(samples);
    }

    /// Drains as many full frames as are currently buffered. Each returned frame carries
    /// the count of interleaved input samples `aacEncEncode` consumed to produce it, so
    /// callers can advance a presentation clock by the frame's real duration rather than
    /// assuming a fixed one.
    pub fn encode(&mut self) -> Result<Vec<(Bytes, usize)>, AudioEncoderError> {
        let mut output = vec![];
        loop {
            let in_args = fdk::AACENC_InArgs {
                numInSamples: self.input_buffer.len() as c_int,
                numAncBytes: 0,
            };

            let mut in_buf = self.input_buffer.as_ptr();
            let mut in_buf_ident: c_int = fdk::AACENC_BufferIdentifier_IN_AUDIO_DATA as c_int;
            let mut in_buf_size: c_int = self.input_buffer.len() as c_int;
            let mut in_buf_el_size: c_int = mem::size_of::<i16>() as c_int;
            let in_desc = fdk::AACENC_BufDesc {
                numBufs: 1,
                bufs: &mut in_buf as *mut _ as *mut *mut c_void,
                bufferIdentifiers: &mut in_buf_ident as *mut _,
                bufSizes: &mut in_buf_size as *mut _,
                bufElSizes: &mut in_buf_el_size as *mut _,
            };

            let mut out_buf = self.output_buffer.as_mut_ptr();
            let mut out_buf_ident: c_int = fdk::AACENC_BufferIdentifier_OUT_BITSTREAM_DATA as c_int;
            let mut out_buf_size: c_int = self.output_buffer.len() as c_int;
            let mut out_buf_el_size: c_int = mem::size_of::<i16>() as c_int;
            let out_desc = fdk::AACENC_BufDesc {
                numBufs: 1,
                bufs: &mut out_buf as *mut _ as *mut *mut c_void,
                bufferIdentifiers: &mut out_buf_ident as *mut _,
                bufSizes: &mut out_buf_size as *mut _,
                bufElSizes: &mut out_buf_el_size as *mut _,
            };

            let mut out_args;
            let res = unsafe {
                out_args = mem::zeroed();
                check(fdk::aacEncEncode(
                    self.encoder,
                    &in_desc,
                    &out_desc,
                    &in_args,
                    &mut out_args,
                ))
            };
            if res.is_err() {
                break;
            }

            let consumed = out_args.numInSamples as usize;
            self.input_buffer.drain(..consumed);

            let encoded_bytes = out_args.numOutBytes as usize;
            if encoded_bytes == 0 {
                break;
            }
            output.push((
                Bytes::copy_from_slice(&self.output_buffer[..encoded_bytes]),
                consumed,
            ));
        }
        Ok(output)
    }
}

impl Drop for FdkAacEncoder {
    fn drop(&mut self) {
        unsafe {
            fdk::aacEncClose(&mut self.encoder as *mut _);
        }
    }
}

fn check(result: fdk::AACENC_ERROR) -> Result<(), AudioEncoderError> {
    if result == fdk::AACENC_ERROR_AACENC_OK {
        Ok(())
    } else {
        Err(AudioEncoderError::Fdk(result as i32))
    }
}

/// A PCM packet's capture-time anchor plus how many of its interleaved samples are still
/// sitting unconsumed in the encoder's input buffer.
struct PendingChunk {
    position_ms: f64,
    remaining_samples: usize,
}

/// Bridges the pool's 40ms PCM packets to the encoder's own frame size: pulls PCM off
/// `source`, re-frames it through `encoder`'s internal buffer, and pushes every encoded
/// AAC frame produced onto `sink`. Runs until the PCM queue is aborted.
pub struct AudioEncoderAdapter {
    encoder: FdkAacEncoder,
    source: std::sync::Arc<LivePacketPool>,
    sink: std::sync::Arc<AacPacketPool>,
    channels: u32,
    sample_rate: u32,
    /// Capture-time anchor of every PCM packet still partly or fully unconsumed by the
    /// encoder, oldest first, so an encoded frame's output pts can be derived from the
    /// real `position` its first sample was captured at rather than a free-running
    /// accumulator that never re-anchors after `discard_audio` skips a packet.
    pending: VecDeque<PendingChunk>,
}

pub struct AudioEncoderAdapterOptions {
    pub sample_rate: u32,
    pub channels: u32,
    pub source: std::sync::Arc<LivePacketPool>,
    pub sink: std::sync::Arc<AacPacketPool>,
}

impl AudioEncoderAdapter {
    /// Advances past `consumed` interleaved samples and returns the output pts (ms) of
    /// the first of them, re-anchoring to each `PendingChunk`'s own `position_ms` as it
    /// is crossed rather than assuming every packet is exactly `AUDIO_PACKET_DURATION_MS`
    /// long.
    fn advance(&mut self, consumed: usize) -> f64 {
        let samples_per_ms = self.sample_rate as f64 * self.channels.max(1) as f64 / 1000.0;
        let mut remaining = consumed;
        let mut out_position = None;
        while remaining > 0 {
            let chunk = self
                .pending
                .front_mut()
                .expect("encoder consumed more samples than were ever pushed");
            if out_position.is_none() {
                out_position = Some(chunk.position_ms);
            }
            if chunk.remaining_samples > remaining {
                chunk.remaining_samples -= remaining;
                chunk.position_ms += remaining as f64 / samples_per_ms;
                remaining = 0;
            } else {
                remaining -= chunk.remaining_samples;
                self.pending.pop_front();
            }
        }
        out_position.expect("loop runs at least once when consumed > 0")
    }
}

impl InitializableThread for AudioEncoderAdapter {
    type InitOptions = AudioEncoderAdapterOptions;
    type SpawnOutput = FdkAacConfig;
    type SpawnError = AudioEncoderError;

    fn init(options: Self::InitOptions) -> Result<(Self, Self::SpawnOutput), Self::SpawnError> {
        let (encoder, config) = FdkAacEncoder::new(options.sample_rate, options.channels)?;
        Ok((
            Self {
                encoder,
                source: options.source,
                sink: options.sink,
                channels: options.channels,
                sample_rate: options.sample_rate,
                pending: VecDeque::new(),
            },
            config,
        ))
    }

    fn run(mut self) {
        loop {
            // Repay the video-drop credit by discarding PCM before pulling the next
            // packet to encode, rather than racing the consumer thread for it.
            while self.source.detect_discard_audio() {
                if !self.source.discard_audio() {
                    break;
                }
            }

            let pcm = match self.source.get_audio(true) {
                GetResult::Packet(pkt) => pkt,
                GetResult::Aborted => {
                    self.sink.abort();
                    return;
                }
                GetResult::Empty => unreachable!("blocking get never returns Empty"),
            };

            let Some(samples) = pcm.as_pcm() else {
                continue;
            };
            self.pending.push_back(PendingChunk {
                position_ms: pcm.position,
                remaining_samples: samples.len(),
            });
            self.encoder.push_samples(samples);

            match self.encoder.encode() {
                Ok(frames) => {
                    for (frame, consumed_samples) in frames {
                        let position = self.advance(consumed_samples);
                        self.sink.push(AudioPacket::aac(frame, position));
                    }
                }
                Err(err) => {
                    error!(?err, "AAC encode failed");
                }
            }
        }
    }

    fn metadata() -> ThreadMetadata {
        ThreadMetadata {
            thread_name: "AudioEncoderAdapter".to_string(),
            thread_instance_name: "live publish".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aac_pool::AacPacketPool, packet_pool::LivePacketPool};

    fn adapter() -> AudioEncoderAdapter {
        let (encoder, _config) = FdkAacEncoder::new(16_000, 1).expect("fdk encoder init");
        AudioEncoderAdapter {
            encoder,
            source: std::sync::Arc::new(LivePacketPool::new(16_000, 1)),
            sink: std::sync::Arc::new(AacPacketPool::new()),
            channels: 1,
            sample_rate: 16_000,
            pending: VecDeque::new(),
        }
    }

    #[test]
    fn advance_reanchors_output_pts_to_each_pending_chunks_own_position() {
        let mut adapter = adapter();
        adapter.pending.push_back(PendingChunk {
            position_ms: 0.0,
            remaining_samples: 640,
        });
        adapter.pending.push_back(PendingChunk {
            position_ms: 200.0,
            remaining_samples: 640,
        });

        let pts = adapter.advance(640 + 320);
        assert!((pts - 0.0).abs() < f64::EPSILON);

        // Skipping forward (e.g. discard_audio dropping a packet before this one) jumps
        // the next output pts to that packet's own anchor plus the in-packet offset
        // already advanced past, rather than a running total oblivious to the gap.
        let pts2 = adapter.advance(320);
        let expected = 200.0 + 320.0 / (16_000.0 / 1000.0);
        assert!((pts2 - expected).abs() < 1e-6);
    }
}

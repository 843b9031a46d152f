use std::{io::Read, path::Path};

use bytes::Bytes;
use live_core::{AudioPacket, VideoPacket, find_start_code, nal_type};

const FRAME_INTERVAL_MS: f64 = 1000.0 / 30.0;

/// Splits a raw Annex-B H.264 elementary stream into access units the way a capture
/// pipeline would hand them to `LivePacketPool::push_video`: the leading SPS/PPS pair
/// coalesced into one packet (so the publisher can build its AVC sequence header from
/// a single buffer), then one packet per subsequent VCL NAL.
pub fn read_h264_access_units(path: &Path) -> std::io::Result<Vec<VideoPacket>> {
    let mut buf = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut buf)?;

    let mut nals = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find_start_code(&buf, pos) {
        let Some(&byte) = buf.get(offset) else { break };
        nals.push((offset, byte & 0x1F));
        pos = offset;
    }

    let mut packets = Vec::new();
    let mut frame_index: f64 = 0.0;
    let mut i = 0;
    while i < nals.len() {
        let (offset, nal) = nals[i];
        let is_param_set = matches!(nal, nal_type::SPS | nal_type::PPS);
        let mut j = i + 1;
        if is_param_set {
            while j < nals.len() && matches!(nals[j].1, nal_type::SPS | nal_type::PPS) {
                j += 1;
            }
        }
        let four_byte_start = offset >= 4 && buf[offset - 4] == 0;
        let start = offset - if four_byte_start { 4 } else { 3 };
        let end = nals.get(j).map(|(o, _)| o - 3).unwrap_or(buf.len());

        let mut pkt = VideoPacket::new(
            Bytes::copy_from_slice(&buf[start..end]),
            frame_index * FRAME_INTERVAL_MS,
        );
        pkt.duration = FRAME_INTERVAL_MS;
        packets.push(pkt);
        if !is_param_set {
            frame_index += 1.0;
        }
        i = j;
    }
    Ok(packets)
}

/// Reads a raw little-endian 16-bit PCM file and chunks it into fixed-size pushes;
/// `LivePacketPool::push_audio` re-frames these into 40ms windows internally, so the
/// chunk size here only bounds how much memory one `push_audio` call copies at once.
pub fn read_pcm_chunks(path: &Path, chunk_samples: usize) -> std::io::Result<Vec<AudioPacket>> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    let mut packets = Vec::new();
    let mut position_ms = 0.0;
    for chunk in samples.chunks(chunk_samples) {
        packets.push(AudioPacket::pcm(chunk.to_vec(), position_ms));
        position_ms += 1000.0 * chunk.len() as f64 / samples.len().max(1) as f64;
    }
    Ok(packets)
}

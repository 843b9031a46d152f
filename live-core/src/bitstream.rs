use bytes::{BufMut, Bytes, BytesMut};

use crate::packet::nal_type;

/// Finds the next Annex-B start code (`00 00 01` or `00 00 00 01`) at or after `from`,
/// returning the offset of the byte immediately following it (the first byte of the NAL
/// unit header). `None` if no further start code exists.
pub fn find_start_code(buf: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 2 < buf.len() {
        if buf[i] == 0 && buf[i + 1] == 0 && buf[i + 2] == 1 {
            return Some(i + 3);
        }
        i += 1;
    }
    None
}

/// One NAL unit's header offset (first byte after its start code) and type.
struct Nal {
    offset: usize,
    nal_type: u8,
}

/// `offset` always points just past a `00 00 01` pattern, but the start code itself may
/// have been 4 bytes (`00 00 00 01`); either way any zero padding that belonged to the
/// *next* start code must not leak into this NAL's trailing bytes.
fn trim_start_code_padding(span: &[u8]) -> &[u8] {
    let trimmed = span.len() - span.iter().rev().take_while(|&&b| b == 0).count();
    &span[..trimmed]
}

fn scan_nals(buf: &[u8]) -> Vec<Nal> {
    let mut nals = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find_start_code(buf, pos) {
        let Some(&byte) = buf.get(offset) else { break };
        nals.push(Nal {
            offset,
            nal_type: byte & 0x1F,
        });
        pos = offset;
    }
    nals
}

/// SPS and PPS payload slices extracted from an Annex-B access unit, in the form they'll
/// be embedded in an `AVCDecoderConfigurationRecord` (no start code, no length prefix).
pub struct SequenceHeader<'a> {
    pub sps: &'a [u8],
    pub pps: &'a [u8],
}

/// Locates the SPS and PPS NAL units in an Annex-B buffer carrying a sequence header
/// (as sent once before the first IDR frame). Returns `None` if either is missing.
pub fn parse_sequence_header(buf: &[u8]) -> Option<SequenceHeader<'_>> {
    let nals = scan_nals(buf);
    let sps_idx = nals.iter().position(|n| n.nal_type == nal_type::SPS)?;
    let pps_idx = nals.iter().position(|n| n.nal_type == nal_type::PPS)?;

    let nal_span = |idx: usize| -> &[u8] {
        let start = nals[idx].offset;
        let end = nals.get(idx + 1).map(|n| n.offset - 3).unwrap_or(buf.len());
        trim_start_code_padding(&buf[start..end])
    };

    Some(SequenceHeader {
        sps: nal_span(sps_idx),
        pps: nal_span(pps_idx),
    })
}

/// Builds the `AVCDecoderConfigurationRecord` FLV/MP4 expect as AVC sequence-header
/// extradata: a fixed header (profile/compat/level copied from the SPS, NAL length size
/// fixed at 4 bytes) followed by one SPS and one PPS, each length-prefixed.
pub fn build_avc_decoder_configuration_record(header: &SequenceHeader<'_>) -> Bytes {
    let mut out = BytesMut::with_capacity(11 + header.sps.len() + header.pps.len());
    out.put_u8(1); // configurationVersion
    out.put_u8(header.sps[1]); // AVCProfileIndication
    out.put_u8(header.sps[2]); // profile_compatibility
    out.put_u8(header.sps[3]); // AVCLevelIndication
    out.put_u8(0xFF); // reserved (6 bits) | lengthSizeMinusOne=3 (4-byte NAL length)
    out.put_u8(0xE1); // reserved (3 bits) | numOfSequenceParameterSets=1
    out.put_u16(header.sps.len() as u16);
    out.put_slice(header.sps);
    out.put_u8(1); // numOfPictureParameterSets
    out.put_u16(header.pps.len() as u16);
    out.put_slice(header.pps);
    out.freeze()
}

/// Rewrites an Annex-B access unit (start-code-delimited NALs) into AVCC form
/// (4-byte big-endian length prefix per NAL, no start codes), dropping any SPS/PPS NALs
/// present since those are carried once as extradata, not per-frame.
pub fn annex_b_to_avcc(buf: &[u8]) -> Bytes {
    let nals = scan_nals(buf);
    let mut out = BytesMut::with_capacity(buf.len());
    for (i, nal) in nals.iter().enumerate() {
        if matches!(nal.nal_type, nal_type::SPS | nal_type::PPS) {
            continue;
        }
        let end = nals.get(i + 1).map(|n| n.offset - 3).unwrap_or(buf.len());
        let payload = trim_start_code_padding(&buf[nal.offset..end]);
        out.put_u32(payload.len() as u32);
        out.put_slice(payload);
    }
    out.freeze()
}

/// MPEG-4 sample-rate table index used by AudioSpecificConfig. `None` for rates the
/// format has no slot for.
pub fn sample_rate_index(sample_rate: u32) -> Option<u8> {
    const TABLE: [u32; 13] = [
        96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
    ];
    TABLE
        .iter()
        .position(|&r| r == sample_rate)
        .map(|i| i as u8)
}

/// Builds the 2-byte AudioSpecificConfig for AAC-LC (object type 2), the extradata FLV
/// expects in the AAC sequence-header tag.
pub fn build_audio_specific_config(sample_rate: u32, channels: u8) -> Option<[u8; 2]> {
    const AAC_LC: u8 = 2;
    let sr_index = sample_rate_index(sample_rate)?;
    Some([
        (AAC_LC << 3) | (sr_index >> 1),
        ((sr_index & 1) << 7) | (channels << 3),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annex_b(nals: &[(u8, &[u8])]) -> Vec<u8> {
        let mut buf = vec![];
        for (nal_type, payload) in nals {
            buf.extend_from_slice(&[0, 0, 0, 1]);
            buf.push(*nal_type);
            buf.extend_from_slice(payload);
        }
        buf
    }

    #[test]
    fn extracts_sps_and_pps_spans() {
        let buf = annex_b(&[
            (nal_type::SPS, &[0x64, 0x00, 0x1F, 0xAB]),
            (nal_type::PPS, &[0xCD, 0xEF]),
            (nal_type::IDR_PICTURE, &[0x01, 0x02, 0x03]),
        ]);
        let header = parse_sequence_header(&buf).unwrap();
        assert_eq!(header.sps, &[nal_type::SPS, 0x64, 0x00, 0x1F, 0xAB]);
        assert_eq!(header.pps, &[nal_type::PPS, 0xCD, 0xEF]);
    }

    #[test]
    fn builds_avcc_record_with_profile_from_sps() {
        let buf = annex_b(&[
            (nal_type::SPS, &[0x64, 0x00, 0x1F, 0xAB]),
            (nal_type::PPS, &[0xCD, 0xEF]),
        ]);
        let header = parse_sequence_header(&buf).unwrap();
        let record = build_avc_decoder_configuration_record(&header);
        assert_eq!(record[0], 1);
        assert_eq!(record[1], 0x64);
        assert_eq!(record[2], 0x00);
        assert_eq!(record[3], 0x1F);
        assert_eq!(record[4], 0xFF);
        assert_eq!(record[5], 0xE1);
    }

    #[test]
    fn annex_b_to_avcc_strips_parameter_sets_and_length_prefixes_frames() {
        let buf = annex_b(&[
            (nal_type::SPS, &[0x64, 0x00, 0x1F]),
            (nal_type::PPS, &[0xCD]),
            (nal_type::IDR_PICTURE, &[0xAA, 0xBB]),
        ]);
        let avcc = annex_b_to_avcc(&buf);
        assert_eq!(&avcc[0..4], &[0, 0, 0, 3]);
        assert_eq!(&avcc[4..7], &[nal_type::IDR_PICTURE, 0xAA, 0xBB]);
    }

    #[test]
    fn sample_rate_44100_maps_to_index_4() {
        assert_eq!(sample_rate_index(44100), Some(4));
        assert_eq!(sample_rate_index(7350), Some(12));
        assert_eq!(sample_rate_index(12345), None);
    }

    #[test]
    fn audio_specific_config_matches_known_bytes_for_44100_stereo() {
        let asc = build_audio_specific_config(44100, 2).unwrap();
        assert_eq!(asc, [0x12, 0x10]);
    }
}

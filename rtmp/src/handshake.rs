use std::{
    io::{Read, Write},
    time::Instant,
};

use rand::RngCore;

use crate::error::RtmpError;

const RTMP_VERSION: u8 = 3;
const HANDSHAKE_SIZE: usize = 1536;

/// Performs the uncompressed RTMP handshake (C0/C1/C2 <-> S0/S1/S2) as the client side.
pub struct ClientHandshake;

impl ClientHandshake {
    pub fn perform<S>(stream: &mut S) -> Result<(), RtmpError>
    where
        S: Read + Write,
    {
        let send_time = Instant::now();

        stream.write_all(&[RTMP_VERSION])?;

        let mut c1 = [0u8; HANDSHAKE_SIZE];
        c1[0..4].copy_from_slice(&0u32.to_be_bytes());
        c1[4..8].fill(0);
        rand::rng().fill_bytes(&mut c1[8..]);
        stream.write_all(&c1)?;
        stream.flush()?;

        let mut s0 = [0u8; 1];
        stream.read_exact(&mut s0)?;
        if s0[0] != RTMP_VERSION {
            return Err(RtmpError::InvalidVersion(s0[0]));
        }

        let mut s1 = [0u8; HANDSHAKE_SIZE];
        stream.read_exact(&mut s1)?;
        let elapsed_ms = send_time.elapsed().as_millis() as u32;

        let mut c2 = s1;
        c2[4..8].copy_from_slice(&elapsed_ms.to_be_bytes());
        stream.write_all(&c2)?;
        stream.flush()?;

        let mut s2 = [0u8; HANDSHAKE_SIZE];
        stream.read_exact(&mut s2)?;

        if s2[0..4] != c1[0..4] || s2[8..HANDSHAKE_SIZE] != c1[8..HANDSHAKE_SIZE] {
            return Err(RtmpError::HandshakeFailed("S2 did not echo C1".into()));
        }

        Ok(())
    }
}

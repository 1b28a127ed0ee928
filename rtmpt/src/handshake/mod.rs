//! Producers of the handshake packets the transport carries.
//!
//! The tunnel itself only needs three things from a handshake implementation: the bytes to
//! send first (C0 + C1), the acknowledgement to send once the peer's S0 + S1 has arrived (C2),
//! and the size of a handshake packet so it knows when S1 and S2 have fully arrived.
//!
//! [`SimpleHandshake`] implements the original (non-digest) RTMP handshake.  Note that this
//! handshake format is not accepted by every server for h.264 publishing; a digest based
//! implementation can be plugged in through [`HandshakeGenerator`].

mod errors;

pub use self::errors::HandshakeError;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use rand::Rng;
use std::io::{Cursor, Write};

/// Size of a single handshake packet (C1, C2, S1 or S2)
pub const SIGNATURE_SIZE: usize = 1536;

const RANDOM_DATA_SIZE: usize = SIGNATURE_SIZE - 8;
const RTMP_VERSION: u8 = 3;

/// Builds the client side handshake packets
pub trait HandshakeGenerator: Send {
    /// Creates the version byte and the first handshake packet
    fn c0_and_c1(&mut self) -> Result<Bytes, HandshakeError>;

    /// Creates the acknowledgement packet from the peer's version byte and first packet.
    /// `s0_and_s1` must contain at least `SIGNATURE_SIZE + 1` bytes.
    fn c2(&mut self, s0_and_s1: &[u8]) -> Result<Bytes, HandshakeError>;
}

/// The original RTMP handshake, where C2 is an echo of the server's S1 packet
pub struct SimpleHandshake {
    my_epoch: u32,
    my_random: [u8; RANDOM_DATA_SIZE],
}

impl SimpleHandshake {
    pub fn new() -> SimpleHandshake {
        SimpleHandshake {
            my_epoch: 0,
            my_random: create_random_data(),
        }
    }
}

impl Default for SimpleHandshake {
    fn default() -> Self {
        SimpleHandshake::new()
    }
}

impl HandshakeGenerator for SimpleHandshake {
    fn c0_and_c1(&mut self) -> Result<Bytes, HandshakeError> {
        self.my_random = create_random_data();

        let mut bytes = Cursor::new(Vec::with_capacity(SIGNATURE_SIZE + 1));
        bytes.write_u8(RTMP_VERSION)?;
        bytes.write_u32::<BigEndian>(self.my_epoch)?;
        bytes.write_u32::<BigEndian>(0)?;
        bytes.write_all(&self.my_random)?;

        Ok(Bytes::from(bytes.into_inner()))
    }

    fn c2(&mut self, s0_and_s1: &[u8]) -> Result<Bytes, HandshakeError> {
        if s0_and_s1.len() < SIGNATURE_SIZE + 1 {
            return Err(HandshakeError::NotEnoughData {
                expected: SIGNATURE_SIZE + 1,
                actual: s0_and_s1.len(),
            });
        }

        if s0_and_s1[0] != RTMP_VERSION {
            return Err(HandshakeError::BadVersionId(s0_and_s1[0]));
        }

        // Send the peer's exact packet 1 back to acknowledge it
        Ok(Bytes::copy_from_slice(&s0_and_s1[1..=SIGNATURE_SIZE]))
    }
}

fn create_random_data() -> [u8; RANDOM_DATA_SIZE] {
    let mut random_data = [0_u8; RANDOM_DATA_SIZE];
    rand::thread_rng().fill(&mut random_data[..]);
    random_data
}

//! Outbound protocol chunks, as seen by the transport.
//!
//! The transport does not know how a chunk's binary layout is built.  It only needs to know
//! how many bytes a chunk carries and how to break it into pieces no larger than the
//! negotiated outbound chunk size.  An RTMP chunk codec can implement [`Chunk`] for its own
//! types; raw byte buffers are supported out of the box.

use bytes::Bytes;
use std::cmp::min;

/// A unit of protocol payload that can be split into bounded size pieces
pub trait Chunk {
    /// Total amount of bytes the chunk carries
    fn len(&self) -> usize;

    /// Splits the chunk into pieces of at most `max_size` bytes.  Concatenating the returned
    /// pieces in order must yield the original chunk.
    fn split(&self, max_size: usize) -> Vec<Bytes>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Chunk for Bytes {
    fn len(&self) -> usize {
        Bytes::len(self)
    }

    fn split(&self, max_size: usize) -> Vec<Bytes> {
        split_bytes(self, max_size)
    }
}

impl Chunk for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn split(&self, max_size: usize) -> Vec<Bytes> {
        split_bytes(&Bytes::copy_from_slice(self), max_size)
    }
}

impl Chunk for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn split(&self, max_size: usize) -> Vec<Bytes> {
        split_bytes(&Bytes::copy_from_slice(self), max_size)
    }
}

/// Slices `data` into consecutive pieces no larger than `max_size`.  Slicing a `Bytes` buffer
/// does not copy the underlying data.
pub fn split_bytes(data: &Bytes, max_size: usize) -> Vec<Bytes> {
    let max_size = max_size.max(1);
    let mut pieces = Vec::with_capacity(data.len() / max_size + 1);
    let mut start_index = 0;
    while start_index < data.len() {
        let end_index = min(start_index + max_size, data.len());
        pieces.push(data.slice(start_index..end_index));
        start_index = end_index;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_is_split_into_max_sized_pieces_with_remainder_last() {
        let chunk = Bytes::from(vec![7_u8; 500]);
        let pieces = Chunk::split(&chunk, 200);

        let sizes: Vec<usize> = pieces.iter().map(|x| x.len()).collect();
        assert_eq!(sizes, vec![200, 200, 100]);
    }

    #[test]
    fn split_preserves_bytes_and_order() {
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();
        let pieces = Chunk::split(&data, 128);

        let rejoined: Vec<u8> = pieces.iter().flat_map(|x| x.iter().cloned()).collect();
        assert_eq!(rejoined, data);
    }

    #[test]
    fn chunk_smaller_than_max_size_is_a_single_piece() {
        let data = [1_u8, 2, 3];
        let pieces = Chunk::split(&data[..], 128);

        assert_eq!(pieces, vec![Bytes::from_static(&[1, 2, 3])]);
    }

    #[test]
    fn empty_chunk_has_no_pieces() {
        let pieces = Chunk::split(&Bytes::new(), 128);

        assert!(pieces.is_empty());
    }
}

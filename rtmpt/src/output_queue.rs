//! Buffers outbound chunks until the transport is able to send them.
//!
//! Chunks are split into pieces no larger than the outbound chunk size, and pieces are grouped
//! into batches.  Each batch becomes the payload of a single `/send` request, so the amount of
//! pieces per batch is capped to keep one request from growing without bound when chunks are
//! produced faster than the network can take them.  Batches are only ever read oldest first.

use crate::chunk::Chunk;
use crate::counters::ByteCounters;
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

pub struct OutputQueue {
    batches: VecDeque<Vec<Bytes>>,
    max_pieces_per_batch: usize,
}

impl OutputQueue {
    pub fn new(max_pieces_per_batch: usize) -> OutputQueue {
        OutputQueue {
            batches: VecDeque::new(),
            max_pieces_per_batch: max_pieces_per_batch.max(1),
        }
    }

    /// Splits the chunk and appends its pieces to the newest batch, starting a new batch first
    /// if the newest one is already full.  All pieces of a single chunk land in the same batch.
    ///
    /// Returns the amount of bytes that were enqueued.
    pub fn enqueue<C: Chunk + ?Sized>(&mut self, chunk: &C, chunk_size: usize, counters: &ByteCounters) -> usize {
        if chunk.is_empty() {
            return 0;
        }

        let needs_new_batch = match self.batches.back() {
            None => true,
            Some(batch) => batch.len() >= self.max_pieces_per_batch,
        };

        if needs_new_batch {
            self.batches.push_back(Vec::new());
        }

        let mut enqueued = 0;
        if let Some(batch) = self.batches.back_mut() {
            for piece in chunk.split(chunk_size) {
                counters.add_queued(piece.len());
                enqueued += piece.len();
                batch.push(piece);
            }
        }

        enqueued
    }

    /// Returns all pieces of the oldest batch joined together, without removing the batch
    pub fn peek_oldest_batch_concatenated(&self) -> Option<Bytes> {
        self.batches.front().map(|batch| concatenate(batch))
    }

    pub fn pop_oldest_batch(&mut self) -> Option<Vec<Bytes>> {
        self.batches.pop_front()
    }

    /// Removes the oldest batch and returns its pieces joined together
    pub fn take_oldest_batch_concatenated(&mut self) -> Option<Bytes> {
        self.pop_oldest_batch().map(|batch| concatenate(&batch))
    }

    /// Amount of batches waiting to be sent
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Discards every batch, returning how many bytes were thrown away
    pub fn clear(&mut self) -> usize {
        let discarded = self.batches
            .iter()
            .flat_map(|batch| batch.iter())
            .map(|piece| piece.len())
            .sum();

        self.batches.clear();
        discarded
    }
}

fn concatenate(pieces: &[Bytes]) -> Bytes {
    if pieces.len() == 1 {
        return pieces[0].clone();
    }

    let total = pieces.iter().map(|x| x.len()).sum();
    let mut buffer = BytesMut::with_capacity(total);
    for piece in pieces {
        buffer.extend_from_slice(piece);
    }

    buffer.freeze()
}

//! Walks the connection through its ready states using the bytes received from the tunnel.

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;
use crate::handshake::{HandshakeError, HandshakeGenerator, SIGNATURE_SIZE};
use super::{ReadyState, RtmptEvent};

#[derive(Debug, Default)]
pub(super) struct ProcessedInput {
    pub events: Vec<RtmptEvent>,

    /// The C2 packet, produced when S0 + S1 have been fully received
    pub acknowledgement: Option<Bytes>,
}

pub(super) struct HandshakeStateMachine {
    state: ReadyState,
    buffer: BytesMut,
}

impl HandshakeStateMachine {
    pub fn new() -> HandshakeStateMachine {
        HandshakeStateMachine {
            state: ReadyState::Uninitialized,
            buffer: BytesMut::new(),
        }
    }

    pub fn state(&self) -> ReadyState {
        self.state
    }

    /// Moves to a new ready state, raising an event if the state actually changed
    pub fn set_ready_state(&mut self, new_state: ReadyState, events: &mut Vec<RtmptEvent>) {
        if self.state == new_state {
            return;
        }

        trace!(from = ?self.state, to = ?new_state, "Ready state changed");
        self.state = new_state;
        events.push(RtmptEvent::ReadyStateChanged(new_state));
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Consumes response bytes (with the delay hint already stripped off)
    pub fn process(&mut self, data: &[u8], handshake: &mut dyn HandshakeGenerator)
        -> Result<ProcessedInput, HandshakeError>
    {
        let mut result = ProcessedInput::default();
        match self.state {
            ReadyState::Uninitialized | ReadyState::Closed => {
                trace!(state = ?self.state, bytes = data.len(), "Ignoring bytes received in a non-connected state");
                return Ok(result);
            }

            _ => (),
        }

        self.buffer.extend_from_slice(data);

        if self.state == ReadyState::VersionSent {
            if self.buffer.len() < SIGNATURE_SIZE + 1 {
                return Ok(result);
            }

            let acknowledgement = handshake.c2(&self.buffer)?;
            self.buffer.advance(SIGNATURE_SIZE + 1);
            result.acknowledgement = Some(acknowledgement);
            self.set_ready_state(ReadyState::AckSent, &mut result.events);
        }

        if self.state == ReadyState::AckSent {
            if self.buffer.len() < SIGNATURE_SIZE {
                return Ok(result);
            }

            self.buffer.advance(SIGNATURE_SIZE);
            self.set_ready_state(ReadyState::HandshakeDone, &mut result.events);
        }

        if self.state == ReadyState::HandshakeDone && !self.buffer.is_empty() {
            let payload = self.buffer.split().freeze();
            result.events.push(RtmptEvent::DataReceived(payload));
        }

        Ok(result)
    }
}

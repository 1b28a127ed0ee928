/// Lifecycle of a tunneled connection, as seen by the layer above the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Nothing has been sent yet
    Uninitialized,

    /// The tunnel is open and C0 + C1 have been sent
    VersionSent,

    /// S0 + S1 have been received and the C2 acknowledgement is built
    AckSent,

    /// S2 has been received.  From here on every inbound byte is protocol payload.
    HandshakeDone,

    Closed,
}

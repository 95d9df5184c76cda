/// The current state of a download transaction.
/// This roughly matches net/base/load_states.h, trimmed to what a
/// single-request connection goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The transaction is idle (not started, or finished).
    #[default]
    Idle,

    /// Connecting to the host (TCP handshake).
    Connecting,

    /// Sending the HTTP request.
    SendingRequest,

    /// Waiting for the response header block.
    WaitingForResponse,

    /// Reading the response body.
    ReadingResponse,
}

//! The download state machine, free of I/O.
//!
//! Drivers run the effects this machine asks for (connect, send, receive,
//! finish) and feed back what happened as events. All three download
//! strategies share it, so they agree on every edge case by construction.

use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::http::accumulator::ResponseAccumulator;
use crate::http::outcome::Outcome;

/// Internal state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connecting,
    Sending,
    ReceivingHeaders,
    ReceivingBody,
    Done,
}

impl State {
    /// Map internal state to public LoadState.
    fn to_load_state(self) -> LoadState {
        match self {
            State::Idle => LoadState::Idle,
            State::Connecting => LoadState::Connecting,
            State::Sending => LoadState::SendingRequest,
            State::ReceivingHeaders => LoadState::WaitingForResponse,
            State::ReceivingBody => LoadState::ReadingResponse,
            State::Done => LoadState::Idle,
        }
    }
}

/// What happened on the network since the last effect.
#[derive(Debug)]
pub enum Event<'a> {
    Connected,
    Sent,
    /// A non-empty chunk arrived.
    Received(&'a [u8]),
    /// The peer closed (zero-byte read).
    Closed,
    Failed(NetError),
}

impl<'a> Event<'a> {
    /// Map one receive result onto an event; zero bytes means the peer closed.
    pub fn from_receive(result: Result<usize, NetError>, buf: &'a [u8]) -> Self {
        match result {
            Ok(0) => Event::Closed,
            Ok(n) => Event::Received(&buf[..n]),
            Err(err) => Event::Failed(err),
        }
    }
}

/// What the driver must do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
    Connect,
    SendRequest,
    Receive,
    /// Close the connection, then publish the outcome. Produced exactly once.
    Finish(Outcome),
    /// Nothing left to do; the transaction already finished.
    Idle,
}

/// One GET transaction as a pure state machine.
///
/// The machine performs no I/O. A driver runs the [`Effect`] returned by
/// [`start`](Self::start) or [`on_event`](Self::on_event) and feeds the
/// result back as an [`Event`], until an `Effect::Finish` carries the
/// outcome.
#[derive(Debug)]
pub struct DownloadTransaction {
    state: State,
    accumulator: ResponseAccumulator,
}

impl Default for DownloadTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadTransaction {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: State::Idle,
            accumulator: ResponseAccumulator::with_capacity(capacity),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Get the current load state (for progress reporting).
    pub fn get_load_state(&self) -> LoadState {
        self.state.to_load_state()
    }

    pub fn accumulator(&self) -> &ResponseAccumulator {
        &self.accumulator
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Begin the transaction. Only the first call asks for a connect.
    pub fn start(&mut self) -> Effect {
        if self.state != State::Idle {
            return Effect::Idle;
        }
        self.state = State::Connecting;
        Effect::Connect
    }

    /// Advance on `event` and return the next effect to run.
    pub fn on_event(&mut self, event: Event<'_>) -> Effect {
        match (self.state, event) {
            (State::Done, _) | (State::Idle, _) => Effect::Idle,
            (_, Event::Failed(err)) => self.finish(Outcome::Failed(err)),
            (State::Connecting, Event::Connected) => {
                self.state = State::Sending;
                Effect::SendRequest
            }
            (State::Sending, Event::Sent) => {
                self.state = State::ReceivingHeaders;
                Effect::Receive
            }
            (State::ReceivingHeaders | State::ReceivingBody, Event::Received(chunk)) => {
                self.accumulator.append(chunk);
                self.advance_receive(false)
            }
            (State::ReceivingHeaders | State::ReceivingBody, Event::Closed) => {
                self.advance_receive(true)
            }
            (state, event) => {
                tracing::error!(?state, ?event, "event out of order");
                self.finish(Outcome::Failed(NetError::TransactionAborted))
            }
        }
    }

    /// Completeness is checked before a close counts as failure, so a peer
    /// that closes right after the last body byte still succeeds.
    fn advance_receive(&mut self, closed: bool) -> Effect {
        self.accumulator.try_parse_headers();

        if let Some(body) = self.accumulator.extract_body() {
            return self.finish(Outcome::Completed(body));
        }
        if let Err(err) = self.accumulator.check_framing() {
            return self.finish(Outcome::Failed(err));
        }
        if closed {
            let err = NetError::PrematureClose {
                received: self.accumulator.body_received(),
                expected: self.accumulator.content_length(),
            };
            return self.finish(Outcome::Failed(err));
        }

        self.state = if self.accumulator.headers_parsed() {
            State::ReceivingBody
        } else {
            State::ReceivingHeaders
        };
        Effect::Receive
    }

    fn finish(&mut self, outcome: Outcome) -> Effect {
        self.state = State::Done;
        Effect::Finish(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io::ErrorKind;

    fn receiving() -> DownloadTransaction {
        let mut tx = DownloadTransaction::new();
        assert_eq!(tx.start(), Effect::Connect);
        assert_eq!(tx.on_event(Event::Connected), Effect::SendRequest);
        assert_eq!(tx.on_event(Event::Sent), Effect::Receive);
        assert_eq!(tx.get_load_state(), LoadState::WaitingForResponse);
        tx
    }

    #[test]
    fn test_happy_path() {
        let mut tx = receiving();
        assert_eq!(
            tx.on_event(Event::Received(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n")),
            Effect::Receive
        );
        assert_eq!(tx.state(), State::ReceivingBody);
        assert_eq!(tx.get_load_state(), LoadState::ReadingResponse);
        assert_eq!(
            tx.on_event(Event::Received(b"hello")),
            Effect::Finish(Outcome::Completed(Bytes::from_static(b"hello")))
        );
        assert!(tx.is_done());
    }

    #[test]
    fn test_finish_only_once() {
        let mut tx = receiving();
        let effect = tx.on_event(Event::Received(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"));
        assert!(matches!(effect, Effect::Finish(Outcome::Completed(_))));
        assert_eq!(tx.on_event(Event::Closed), Effect::Idle);
        assert_eq!(
            tx.on_event(Event::Failed(NetError::ReceiveFailed(ErrorKind::ConnectionReset))),
            Effect::Idle
        );
        assert_eq!(tx.start(), Effect::Idle);
    }

    #[test]
    fn test_connect_failure() {
        let mut tx = DownloadTransaction::new();
        tx.start();
        assert_eq!(
            tx.on_event(Event::Failed(NetError::ConnectionTimedOut)),
            Effect::Finish(Outcome::Failed(NetError::ConnectionTimedOut))
        );
    }

    #[test]
    fn test_missing_content_length_is_immediate() {
        let mut tx = receiving();
        assert_eq!(
            tx.on_event(Event::Received(b"HTTP/1.1 200 OK\r\nServer: x\r\n\r\n")),
            Effect::Finish(Outcome::Failed(NetError::MissingContentLength))
        );
    }

    #[test]
    fn test_close_after_exact_body() {
        let mut tx = receiving();
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
        let effect = tx.on_event(Event::Received(response));
        assert_eq!(effect, Effect::Finish(Outcome::Completed(Bytes::from_static(b"ok"))));
    }

    #[test]
    fn test_premature_close_mid_body() {
        let mut tx = receiving();
        tx.on_event(Event::Received(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc"));
        assert_eq!(
            tx.on_event(Event::Closed),
            Effect::Finish(Outcome::Failed(NetError::PrematureClose {
                received: 3,
                expected: Some(10),
            }))
        );
    }

    #[test]
    fn test_premature_close_mid_headers() {
        let mut tx = receiving();
        tx.on_event(Event::Received(b"HTTP/1.1 200 OK\r\nContent-Le"));
        assert_eq!(tx.state(), State::ReceivingHeaders);
        assert_eq!(
            tx.on_event(Event::Closed),
            Effect::Finish(Outcome::Failed(NetError::PrematureClose {
                received: 0,
                expected: None,
            }))
        );
    }

    #[test]
    fn test_out_of_order_event_aborts() {
        let mut tx = DownloadTransaction::new();
        tx.start();
        assert_eq!(
            tx.on_event(Event::Sent),
            Effect::Finish(Outcome::Failed(NetError::TransactionAborted))
        );
    }
}

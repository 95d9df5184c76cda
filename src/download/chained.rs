//! Continuation-chained driver.
//!
//! Each network step is a future that owns the transaction state and hands
//! it back with its result. The next step is attached with `map` rather than
//! awaited inline, and each finished stage schedules its successor as a
//! fresh task. The receive loop is therefore a chain of short-lived tasks
//! rather than one future nested a level deeper per chunk; the outcome
//! arrives only through the [`OutcomeSlot`].

use crate::base::neterror::NetError;
use crate::download::{log_outcome, DownloadConfig, DownloadStrategy, Downloading};
use crate::http::outcome::OutcomeSlot;
use crate::http::transaction::{DownloadTransaction, Effect, Event};
use crate::http::Target;
use crate::socket::Connection;
use futures::future::{self, FutureExt};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChainedDownloader {
    buffer_capacity: usize,
    connect_timeout: Option<Duration>,
}

struct ChainState {
    target: Target,
    transaction: DownloadTransaction,
    connection: Option<Connection>,
    buffer: Vec<u8>,
    connect_timeout: Option<Duration>,
    slot: OutcomeSlot,
}

impl ChainedDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            buffer_capacity: config.receive_buffer_len(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

impl DownloadStrategy for ChainedDownloader {
    fn name(&self) -> &'static str {
        "chained"
    }

    fn download(&self, target: Target) -> Downloading {
        let (slot, receiver) = OutcomeSlot::channel();
        let mut state = ChainState {
            target,
            transaction: DownloadTransaction::with_capacity(self.buffer_capacity),
            connection: None,
            buffer: vec![0u8; self.buffer_capacity],
            connect_timeout: self.connect_timeout,
            slot,
        };
        let effect = state.transaction.start();
        future::lazy(move |_| continue_with(state, effect))
            .then(move |()| receiver.wait())
            .boxed()
    }
}

/// Schedule the stage for `effect`. Returns once the stage is spawned; the
/// stage itself schedules whatever comes next.
fn continue_with(state: ChainState, effect: Effect) {
    match effect {
        Effect::Connect => schedule(connect(state).map(|(mut state, result)| {
            let event = match result {
                Ok(conn) => {
                    state.connection = Some(conn);
                    Event::Connected
                }
                Err(err) => Event::Failed(err),
            };
            let effect = state.transaction.on_event(event);
            (state, effect)
        })),
        Effect::SendRequest => schedule(send(state).map(|(mut state, result)| {
            let event = match result {
                Ok(_) => Event::Sent,
                Err(err) => Event::Failed(err),
            };
            let effect = state.transaction.on_event(event);
            (state, effect)
        })),
        Effect::Receive => schedule(receive(state).map(|(mut state, result)| {
            let s = &mut state;
            let effect = s.transaction.on_event(Event::from_receive(result, &s.buffer));
            (state, effect)
        })),
        Effect::Finish(outcome) => {
            let mut state = state;
            if let Some(mut conn) = state.connection.take() {
                conn.close();
            }
            log_outcome("chained", &state.target, &outcome);
            state.slot.resolve(outcome);
        }
        Effect::Idle => {}
    }
}

/// Run `stage` as its own task and continue with the effect it yields.
fn schedule<F>(stage: F)
where
    F: Future<Output = (ChainState, Effect)> + Send + 'static,
{
    tokio::spawn(stage.map(|(state, effect)| continue_with(state, effect)));
}

fn connect(state: ChainState) -> impl Future<Output = (ChainState, Result<Connection, NetError>)> {
    async move {
        let result = Connection::connect(&state.target, state.connect_timeout).await;
        (state, result)
    }
}

fn send(mut state: ChainState) -> impl Future<Output = (ChainState, Result<usize, NetError>)> {
    async move {
        let result = match state.connection.as_mut() {
            Some(conn) => conn.send_request(&state.target).await,
            None => Err(NetError::SocketNotConnected),
        };
        (state, result)
    }
}

fn receive(mut state: ChainState) -> impl Future<Output = (ChainState, Result<usize, NetError>)> {
    async move {
        let result = match state.connection.as_mut() {
            Some(conn) => conn.receive_chunk(&mut state.buffer).await,
            None => Err(NetError::SocketNotConnected),
        };
        (state, result)
    }
}

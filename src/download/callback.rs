//! Callback-driven driver.
//!
//! Every network step is started with `begin_*`, which spawns the operation
//! and calls the given callback with the transaction state once it is done.
//! The next step is issued from inside that callback. There is no implicit
//! continuation context: the whole per-transaction state travels as one
//! boxed record through every callback.

use crate::base::neterror::NetError;
use crate::download::{log_outcome, DownloadConfig, DownloadStrategy, Downloading};
use crate::http::outcome::OutcomeSlot;
use crate::http::transaction::{DownloadTransaction, Effect, Event};
use crate::http::Target;
use crate::socket::Connection;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CallbackDownloader {
    buffer_capacity: usize,
    connect_timeout: Option<Duration>,
}

/// Everything one transaction needs, handed from callback to callback.
struct CallbackState {
    target: Target,
    transaction: DownloadTransaction,
    connection: Option<Connection>,
    buffer: Vec<u8>,
    connect_timeout: Option<Duration>,
    slot: OutcomeSlot,
}

type Callback<T> = fn(Box<CallbackState>, Result<T, NetError>);

impl CallbackDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            buffer_capacity: config.receive_buffer_len(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

impl DownloadStrategy for CallbackDownloader {
    fn name(&self) -> &'static str {
        "callback"
    }

    fn download(&self, target: Target) -> Downloading {
        let buffer_capacity = self.buffer_capacity;
        let connect_timeout = self.connect_timeout;
        Box::pin(async move {
            let (slot, receiver) = OutcomeSlot::channel();
            let mut state = Box::new(CallbackState {
                target,
                transaction: DownloadTransaction::with_capacity(buffer_capacity),
                connection: None,
                buffer: vec![0u8; buffer_capacity],
                connect_timeout,
                slot,
            });
            let effect = state.transaction.start();
            dispatch(state, effect);
            receiver.wait().await
        })
    }
}

fn dispatch(mut state: Box<CallbackState>, effect: Effect) {
    match effect {
        Effect::Connect => begin_connect(state, on_connected),
        Effect::SendRequest => begin_send(state, on_sent),
        Effect::Receive => begin_receive(state, on_received),
        Effect::Finish(outcome) => {
            if let Some(mut conn) = state.connection.take() {
                conn.close();
            }
            log_outcome("callback", &state.target, &outcome);
            state.slot.resolve(outcome);
        }
        Effect::Idle => {}
    }
}

fn begin_connect(state: Box<CallbackState>, callback: Callback<Connection>) {
    tokio::spawn(async move {
        let result = Connection::connect(&state.target, state.connect_timeout).await;
        callback(state, result);
    });
}

fn begin_send(mut state: Box<CallbackState>, callback: Callback<usize>) {
    tokio::spawn(async move {
        let s = &mut *state;
        let result = match s.connection.as_mut() {
            Some(conn) => conn.send_request(&s.target).await,
            None => Err(NetError::SocketNotConnected),
        };
        callback(state, result);
    });
}

fn begin_receive(mut state: Box<CallbackState>, callback: Callback<usize>) {
    tokio::spawn(async move {
        let s = &mut *state;
        let result = match s.connection.as_mut() {
            Some(conn) => conn.receive_chunk(&mut s.buffer).await,
            None => Err(NetError::SocketNotConnected),
        };
        callback(state, result);
    });
}

fn on_connected(mut state: Box<CallbackState>, result: Result<Connection, NetError>) {
    let event = match result {
        Ok(conn) => {
            state.connection = Some(conn);
            Event::Connected
        }
        Err(err) => Event::Failed(err),
    };
    let effect = state.transaction.on_event(event);
    dispatch(state, effect);
}

fn on_sent(mut state: Box<CallbackState>, result: Result<usize, NetError>) {
    let event = match result {
        Ok(_) => Event::Sent,
        Err(err) => Event::Failed(err),
    };
    let effect = state.transaction.on_event(event);
    dispatch(state, effect);
}

fn on_received(mut state: Box<CallbackState>, result: Result<usize, NetError>) {
    let s = &mut *state;
    let effect = s.transaction.on_event(Event::from_receive(result, &s.buffer));
    dispatch(state, effect);
}

//! Sequential driver.
//!
//! The whole transaction is one ordinary loop inside a single task: every
//! network step is awaited in place and the loop resumes top to bottom.

use crate::base::neterror::NetError;
use crate::download::{log_outcome, DownloadConfig, DownloadStrategy, Downloading};
use crate::http::outcome::OutcomeSlot;
use crate::http::transaction::{DownloadTransaction, Effect, Event};
use crate::http::Target;
use crate::socket::Connection;
use std::time::Duration;

/// Sequential driver: one loop, one `.await` per network step.
#[derive(Debug, Clone)]
pub struct AwaitedDownloader {
    buffer_capacity: usize,
    connect_timeout: Option<Duration>,
}

impl AwaitedDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            buffer_capacity: config.receive_buffer_len(),
            connect_timeout: config.connect_timeout(),
        }
    }

    async fn run(&self, target: &Target, slot: &OutcomeSlot) {
        let mut transaction = DownloadTransaction::with_capacity(self.buffer_capacity);
        let mut connection: Option<Connection> = None;
        let mut buffer = vec![0u8; self.buffer_capacity];

        let mut effect = transaction.start();
        loop {
            effect = match effect {
                Effect::Connect => match Connection::connect(target, self.connect_timeout).await {
                    Ok(conn) => {
                        connection = Some(conn);
                        transaction.on_event(Event::Connected)
                    }
                    Err(err) => transaction.on_event(Event::Failed(err)),
                },
                Effect::SendRequest => {
                    let result = match connection.as_mut() {
                        Some(conn) => conn.send_request(target).await,
                        None => Err(NetError::SocketNotConnected),
                    };
                    match result {
                        Ok(_) => transaction.on_event(Event::Sent),
                        Err(err) => transaction.on_event(Event::Failed(err)),
                    }
                }
                Effect::Receive => {
                    let result = match connection.as_mut() {
                        Some(conn) => conn.receive_chunk(&mut buffer).await,
                        None => Err(NetError::SocketNotConnected),
                    };
                    transaction.on_event(Event::from_receive(result, &buffer))
                }
                Effect::Finish(outcome) => {
                    if let Some(mut conn) = connection.take() {
                        conn.close();
                    }
                    log_outcome(self.name(), target, &outcome);
                    slot.resolve(outcome);
                    return;
                }
                Effect::Idle => return,
            };
        }
    }
}

impl DownloadStrategy for AwaitedDownloader {
    fn name(&self) -> &'static str {
        "awaited"
    }

    fn download(&self, target: Target) -> Downloading {
        let this = self.clone();
        Box::pin(async move {
            let (slot, receiver) = OutcomeSlot::channel();
            this.run(&target, &slot).await;
            drop(slot);
            receiver.wait().await
        })
    }
}

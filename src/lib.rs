//! # trifetch
//!
//! Minimal HTTP/1.1 downloads over raw TCP, with the same transaction
//! logic driven three different ways.
//!
//! A download sends one `GET` with `Connection: close`, then reads the
//! response incrementally until `Content-Length` body bytes have arrived.
//! Reads may return any number of bytes, so the header terminator and the
//! body can straddle reads arbitrarily; the
//! [`ResponseAccumulator`](http::ResponseAccumulator) handles that.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trifetch::download::{DownloadConfig, DownloadCoordinator, StrategyKind};
//! use trifetch::http::Target;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DownloadConfig {
//!         strategy: StrategyKind::Callback,
//!         ..Default::default()
//!     };
//!     let target = Target::new("127.0.0.1:8080".parse().unwrap(), "localhost", "/file1");
//!     let report = DownloadCoordinator::from_config(&config)
//!         .run_repeated(target, 3)
//!         .await;
//!     println!("{} of {} failed", report.failure_count(), report.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types and load states
//! - [`http`] - Targets, the response accumulator and the transaction state machine
//! - [`socket`] - The single-use TCP connection
//! - [`download`] - The three strategies, configuration, retry and the coordinator
//! - [`server`] - A single-shot file server to download from

pub mod base;
pub mod download;
pub mod http;
pub mod server;
pub mod socket;

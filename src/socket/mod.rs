//! Socket handling.
//!
//! - [`connection`]: one TCP socket, one request, chunked receive

pub mod connection;

pub use connection::Connection;

//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): network error codes, grouped into
//!   [`ErrorCategory`](neterror::ErrorCategory) for reporting
//! - [`LoadState`](loadstate::LoadState): what a transaction is waiting on
//! - [`IoResultExt`](context::IoResultExt): attaches the failing step to raw I/O errors

pub mod context;
pub mod loadstate;
pub mod neterror;

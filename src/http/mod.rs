pub mod accumulator;
pub mod outcome;
pub mod request;
pub mod transaction;

// Re-exports for convenience
pub use accumulator::ResponseAccumulator;
pub use outcome::{Outcome, OutcomeReceiver, OutcomeSlot};
pub use request::Target;
pub use transaction::DownloadTransaction;

//! Job queue for the transcription pipeline.
//!
//! A pending FIFO plus a one-slot `currently_processing` row, both in
//! the embedded store so they survive restarts. Writer separation keeps
//! the transitions race-free: discovery is the only promoter, the
//! processor is the only clearer.

pub mod cancel;
pub mod error;
pub mod queue;

pub use cancel::CancelRegistry;
pub use error::{QueueError, QueueResult};
pub use queue::{CurrentJob, Queue};

//! Append-only log of saga progress.
//!
//! Every step a saga takes is recorded here before the saga moves on, so an
//! interrupted saga can be found and resumed or compensated after a restart.

pub mod entry;
pub mod error;
pub mod log;
pub mod memory;
pub mod postgres;

pub use entry::{SagaLogEntry, SagaLogEntryBuilder, Sequence};
pub use error::{Result, SagaLogError};
pub use log::{SagaLog, SagaLogExt, validate_append};
pub use memory::InMemorySagaLog;
pub use postgres::PostgresSagaLog;

//! Generates filler files of an exact size on disk, with live progress,
//! throughput and ETA reporting and cooperative cancellation that removes
//! the partial file.

pub mod config;
pub mod core;
pub mod error;
pub mod generate;
pub mod state;

pub use crate::core::manager::{
    GenerationStatus, SessionController, SessionEvent, SessionHandle,
};
pub use error::{StartError, ValidationError, WriteError};
pub use generate::engine::{DEFAULT_CHUNK_SIZE, FILL_BYTE, Outcome, WriterEngine};
pub use generate::progress::ProgressSnapshot;
pub use state::request::{DEFAULT_FILE_NAME, GenerationRequest, SizeUnit};
pub use state::session::CancelToken;

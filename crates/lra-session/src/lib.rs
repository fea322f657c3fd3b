//! Session execution: one prompt against a coding backend, reduced to a
//! `SessionOutcome`.

pub mod backend;
pub mod cli_backend;
pub mod event;
pub mod progress;
pub mod runner;

pub use backend::SessionBackend;
pub use cli_backend::{CliBackend, CliCommand};
pub use event::{BackendEvent, StreamLine, parse_stream_line};
pub use progress::{ProgressSummary, has_progress_marker, read_progress};
pub use runner::{outcome_from_failure, run_session};

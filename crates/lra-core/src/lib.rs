//! Shared types for the long-running agent harness.

pub mod content;
pub mod error;
pub mod types;

pub use content::ContentBlock;
pub use error::AppError;
pub use types::{PROGRESS_MARKER_FILE, SessionKind, SessionOutcome, SessionStatus};

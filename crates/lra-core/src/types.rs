use serde::{Deserialize, Serialize};

/// Project-relative file whose existence marks a project with prior session history.
pub const PROGRESS_MARKER_FILE: &str = "feature_list.json";

/// Which prompt/model pair a session runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// First session of a fresh project (planning prompt + planning model).
    Initializer,
    /// Every other session.
    Coding,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializer => "initializer",
            Self::Coding => "coding",
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse status of a session attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Continue,
    RateLimited,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::RateLimited => "rate_limited",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of one session attempt.
///
/// Session execution never fails with an error value: every failure mode
/// of the backend is folded into `RateLimited` or `Error` so the caller can
/// treat them as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Session completed; `response` is the concatenated assistant text.
    Continue { response: String },
    /// Backend throttled the session.
    RateLimited {
        /// Explicit wait recovered from the failure description, if any.
        retry_after_secs: Option<u64>,
        description: String,
    },
    /// Any other failure.
    Error { message: String },
}

impl SessionOutcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Continue { .. } => SessionStatus::Continue,
            Self::RateLimited { .. } => SessionStatus::RateLimited,
            Self::Error { .. } => SessionStatus::Error,
        }
    }

    /// Wire-level payload: response text, explicit wait seconds, or diagnostic.
    ///
    /// Parses as an integer only for a rate-limited outcome carrying an
    /// explicit wait; a rate limit without one yields an empty payload.
    pub fn payload(&self) -> String {
        match self {
            Self::Continue { response } => response.clone(),
            Self::RateLimited {
                retry_after_secs, ..
            } => retry_after_secs
                .map(|secs| secs.to_string())
                .unwrap_or_default(),
            Self::Error { message } => message.clone(),
        }
    }
}

//! Error taxonomy
//!
//! Nothing here is fatal: validation and state errors are rejected at the
//! boundary, storage and render errors are recovered with safe defaults.

use std::fmt;

/// Input rejected at the boundary (HTTP 400 or a blocked UI action)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Not enough participants to draw from
    TooFewParticipants { count: usize, min: usize },
    /// Payload-size protection
    TooManyParticipants { count: usize, max: usize },
    /// Name was empty after trimming
    BlankName,
    /// Name longer than the configured limit
    NameTooLong { len: usize, max: usize },
    /// Bulk add contained no usable names
    NoValidNames,
    /// Winner index does not address a segment
    IndexOutOfRange { index: usize, count: usize },
    /// Participant lookup failed
    NotFound(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::TooFewParticipants { count, min } => {
                write!(f, "need at least {} participants to spin (have {})", min, count)
            }
            ValidationError::TooManyParticipants { count, max } => {
                write!(f, "at most {} participants allowed (got {})", max, count)
            }
            ValidationError::BlankName => write!(f, "participant name is required"),
            ValidationError::NameTooLong { len, max } => {
                write!(f, "participant name is {} characters, limit is {}", len, max)
            }
            ValidationError::NoValidNames => write!(f, "no valid names were sent"),
            ValidationError::IndexOutOfRange { index, count } => {
                write!(f, "winner index {} out of range for {} segments", index, count)
            }
            ValidationError::NotFound(what) => write!(f, "participant not found: {}", what),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Request that conflicts with the current wheel state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A spin is already in flight
    AlreadySpinning,
    /// Server-chosen result disagrees with the local roster
    RosterMismatch { expected: usize, actual: usize },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::AlreadySpinning => write!(f, "the wheel is already spinning"),
            StateError::RosterMismatch { expected, actual } => write!(
                f,
                "server spun {} participants but {} are on the wheel",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for StateError {}

/// Persisted state could not be read or written
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Corrupt(serde_json::Error),
    /// Backend not reachable (e.g. LocalStorage disabled)
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "storage I/O failed: {}", e),
            StorageError::Corrupt(e) => write!(f, "stored data is corrupt: {}", e),
            StorageError::Unavailable(why) => write!(f, "storage unavailable: {}", why),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Corrupt(e) => Some(e),
            StorageError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Corrupt(e)
    }
}

/// Drawing surface missing or refused an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    SurfaceUnavailable,
    Backend(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::SurfaceUnavailable => write!(f, "drawing surface unavailable"),
            RenderError::Backend(msg) => write!(f, "drawing backend error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// Crate-level error
#[derive(Debug)]
pub enum DrawError {
    Validation(ValidationError),
    State(StateError),
    Storage(StorageError),
    Render(RenderError),
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawError::Validation(e) => e.fmt(f),
            DrawError::State(e) => e.fmt(f),
            DrawError::Storage(e) => e.fmt(f),
            DrawError::Render(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for DrawError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DrawError::Validation(e) => Some(e),
            DrawError::State(e) => Some(e),
            DrawError::Storage(e) => Some(e),
            DrawError::Render(e) => Some(e),
        }
    }
}

impl From<ValidationError> for DrawError {
    fn from(e: ValidationError) -> Self {
        DrawError::Validation(e)
    }
}

impl From<StateError> for DrawError {
    fn from(e: StateError) -> Self {
        DrawError::State(e)
    }
}

impl From<StorageError> for DrawError {
    fn from(e: StorageError) -> Self {
        DrawError::Storage(e)
    }
}

impl From<RenderError> for DrawError {
    fn from(e: RenderError) -> Self {
        DrawError::Render(e)
    }
}

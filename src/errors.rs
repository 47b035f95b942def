// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner
//!
//! Errors are split by how far they are allowed to travel:
//!
//! - [`ReadError`] and [`ParseError`] are recovered inside their component
//!   (frame source and decoder respectively) and never reach the user.
//! - [`OpenError`] ends a start attempt and is surfaced through the pipeline.
//! - [`PipelineError`] reports control-plane misuse of the pipeline.
//! - [`AppError`] is the umbrella used by the command line front-end.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Failure to acquire the camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// Every candidate device index failed to open
    NoDeviceAvailable {
        /// Indices that were tried, in order
        tried: Vec<u32>,
    },
    /// `open` was called without an intervening `close`
    AlreadyOpen,
}

/// Failure to read a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The source has no open device
    NotOpen,
    /// No frame arrived within the read timeout
    Timeout,
    /// The device went away
    Disconnected,
    /// Any other backend failure
    Backend(String),
}

/// Failure to turn a QR payload into a product record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The payload is not valid UTF-8 JSON
    MalformedPayload(String),
    /// The payload is JSON but not the product record shape
    SchemaMismatch(String),
}

/// Control-plane errors from the scan pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The pipeline was stopped; only `restart()` revives it
    Stopped,
    /// The frame source was lost (a worker thread panicked while owning it)
    SourceLost,
    /// A worker thread could not be spawned
    Spawn(String),
    /// The camera could not be opened
    Open(OpenError),
}

/// Main application error type
#[derive(Debug)]
pub enum AppError {
    /// Scan pipeline errors
    Pipeline(PipelineError),
    /// Camera backend errors outside the pipeline (listing, still images)
    Camera(String),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::NoDeviceAvailable { tried } => {
                write!(f, "No working camera found (tried indices {:?})", tried)
            }
            OpenError::AlreadyOpen => write!(f, "Camera is already open"),
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::NotOpen => write!(f, "Camera is not open"),
            ReadError::Timeout => write!(f, "Timed out waiting for a frame"),
            ReadError::Disconnected => write!(f, "Camera disconnected"),
            ReadError::Backend(msg) => write!(f, "Frame read failed: {}", msg),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            ParseError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Stopped => write!(f, "Scan pipeline is stopped"),
            PipelineError::SourceLost => write!(f, "Frame source was lost"),
            PipelineError::Spawn(msg) => write!(f, "Failed to spawn worker: {}", msg),
            PipelineError::Open(e) => write!(f, "Failed to start camera: {}", e),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Pipeline(e) => write!(f, "{}", e),
            AppError::Camera(msg) => write!(f, "Camera error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for OpenError {}
impl std::error::Error for ReadError {}
impl std::error::Error for ParseError {}
impl std::error::Error for PipelineError {}
impl std::error::Error for AppError {}

impl From<OpenError> for PipelineError {
    fn from(err: OpenError) -> Self {
        PipelineError::Open(err)
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<crate::backends::camera::BackendError> for AppError {
    fn from(err: crate::backends::camera::BackendError) -> Self {
        AppError::Camera(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

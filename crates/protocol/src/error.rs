//! Error types for the protocol crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol error type covering malformed request parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unknown `sortBy` value.
    #[error("invalid sortBy value: {0}")]
    InvalidSortBy(String),

    /// Unknown `sortOrder` value.
    #[error("invalid sortOrder value: {0}")]
    InvalidSortOrder(String),

    /// Range header could not be parsed.
    #[error("invalid range header: {0}")]
    InvalidRange(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Error codes surfaced to HTTP clients.
///
/// Every failure inside the server is normalized into one of these before it
/// leaves the process. The client only ever sees the code, its status and a
/// generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// A required query parameter is absent.
    MissingParameter,
    /// A query parameter has a value outside its domain.
    InvalidParameter,
    /// The requested path resolves outside the library root.
    AccessDenied,
    /// The path does not exist or could not be stat'ed.
    NotFound,
    /// The path exists but is not a directory.
    NotADirectory,
    /// The path exists but is not a regular file.
    NotAFile,
    /// The file extension is not on the endpoint's allow-list.
    UnsupportedExtension,
    /// Unexpected I/O or extraction failure.
    Internal,
}

impl ErrorCode {
    /// HTTP status code for this error.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::MissingParameter | ErrorCode::InvalidParameter => 400,
            ErrorCode::AccessDenied => 403,
            ErrorCode::NotFound | ErrorCode::NotADirectory | ErrorCode::NotAFile => 404,
            ErrorCode::UnsupportedExtension => 415,
            ErrorCode::Internal => 500,
        }
    }

    /// Generic, client-safe message. Never includes paths or OS error text.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorCode::MissingParameter => "Path parameter is required",
            ErrorCode::InvalidParameter => "Invalid parameter",
            ErrorCode::AccessDenied => "Access denied",
            ErrorCode::NotFound => "Not found",
            ErrorCode::NotADirectory => "Directory not found",
            ErrorCode::NotAFile => "File not found",
            ErrorCode::UnsupportedExtension => "File type not supported",
            ErrorCode::Internal => "Internal server error",
        }
    }
}

/// JSON body returned with every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable, generic message.
    pub error: String,
    /// Machine-readable code.
    pub code: ErrorCode,
}

impl ErrorBody {
    /// Build a body carrying the code's default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            error: code.public_message().to_string(),
            code,
        }
    }

    /// Build a body with a caller-chosen generic message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
        }
    }
}

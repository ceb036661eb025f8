//! # Error Types
//!
//! This module defines error types used throughout the formfill library.

use thiserror::Error;

use crate::element::ElementId;

/// Main error type for formfill operations
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The uploaded template could not be decoded as an image
    #[error("Unsupported template format: {0}")]
    UnsupportedFormat(String),

    /// Render attempted before any template was loaded
    #[error("No template loaded")]
    NoTemplate,

    /// The template is not mounted anywhere, so its display size is unknown
    #[error("Display metrics unavailable: template is not currently rendered")]
    DisplayMetricsUnavailable,

    /// Update referenced an element that no longer exists
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Font loading error
    #[error("Font error: {0}")]
    Font(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// The external field-extraction service failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Server-level errors (bind, serve)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OverlayError>;

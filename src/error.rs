//! Error types for the supergrobid library.
//!
//! Only document-level failures live here. Degraded service calls and
//! element-level resolver failures have their own types
//! ([`crate::services::ServiceError`], [`crate::resolve::ResolverFailure`])
//! and are collected into the per-document report instead of aborting.

use std::io;
use thiserror::Error;

/// Result type alias for supergrobid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort processing of a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The deterministic extractor could not produce fragments.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The document has no pages.
    #[error("Document contains no pages")]
    EmptyDocument,

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Reconciliation input violates a structural precondition.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Invalid configuration file or option value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error during rendering (Markdown, JSON, TEI).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Resolved content was attached to an element that already had some.
    #[error("Element {0} already carries a resolution")]
    AlreadyResolved(usize),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error comes from the input document rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Encrypted
                | Error::EmptyDocument
                | Error::MalformedInput(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

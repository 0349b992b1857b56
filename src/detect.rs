//! PDF header sniffing.
//!
//! The extractor refuses anything that does not carry a `%PDF-x.y` header
//! before handing the file to lopdf, so non-PDF inputs fail fast with
//! [`Error::UnknownFormat`] instead of an opaque parse error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Header marker that opens every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Readers tolerate junk before the header; the marker must appear in this prefix.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Parsed PDF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfHeader {
    /// Major version digit
    pub major: u8,
    /// Minor version digit
    pub minor: u8,
    /// Byte offset of the `%PDF-` marker
    pub offset: usize,
}

impl PdfHeader {
    /// Version as a dotted string, e.g. "1.7".
    pub fn version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}.{}", self.major, self.minor)
    }
}

/// Read the header of a file on disk.
///
/// # Example
/// ```no_run
/// use supergrobid::detect::sniff_path;
///
/// let header = sniff_path("paper.pdf").unwrap();
/// println!("PDF version: {}", header.version());
/// ```
pub fn sniff_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    file.take(HEADER_SEARCH_WINDOW as u64)
        .read_to_end(&mut prefix)?;
    sniff_bytes(&prefix)
}

/// Locate and parse the `%PDF-x.y` header in a byte prefix.
pub fn sniff_bytes(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version = window
        .get(offset + PDF_MAGIC.len()..offset + PDF_MAGIC.len() + 3)
        .ok_or(Error::UnknownFormat)?;

    match version {
        [major @ b'1'..=b'2', b'.', minor @ b'0'..=b'9'] => Ok(PdfHeader {
            major: major - b'0',
            minor: minor - b'0',
            offset,
        }),
        other => Err(Error::UnsupportedVersion(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Whether the file at `path` looks like a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    sniff_path(path).is_ok()
}

//! PDF extraction backed by lopdf.

use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use super::layout::{page_fragments, ContentDecoder};
use super::{ExtractOptions, ExtractedDocument, Extractor};
use crate::detect::sniff_path;
use crate::error::{Error, Result};
use crate::model::{DocumentMetadata, PageGeometry, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};

/// Extractor over lopdf content-stream decoding.
#[derive(Debug, Clone, Default)]
pub struct LopdfExtractor {
    options: ExtractOptions,
}

impl LopdfExtractor {
    /// Create an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extract from an in-memory PDF.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<ExtractedDocument> {
        crate::detect::sniff_bytes(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(map_load_error)?;
        self.extract_document(&doc)
    }

    fn extract_document(&self, doc: &LopdfDocument) -> Result<ExtractedDocument> {
        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(Error::EmptyDocument);
        }

        let mut metadata = extract_metadata(doc);
        metadata.page_count = page_ids.len() as u32;

        let decoder = ContentDecoder::new(doc);
        let mut pages = Vec::with_capacity(page_ids.len());
        let mut fragments = Vec::new();
        let mut next_seq = 0usize;

        // lopdf numbers pages from 1; the model indexes from 0
        for (index, (page_num, page_id)) in page_ids.iter().enumerate() {
            let (geometry, origin) = page_geometry(doc, *page_id, index as u32);
            pages.push(geometry);

            match decoder.page_spans(*page_id) {
                Ok(spans) => {
                    let page_frags = page_fragments(
                        spans,
                        &geometry,
                        origin,
                        self.options.cell_gap_factor,
                        &mut next_seq,
                    );
                    log::debug!("page {}: {} fragments", page_num, page_frags.len());
                    fragments.extend(page_frags);
                }
                Err(e) if self.options.lenient => {
                    log::warn!("Skipping page {}: {}", page_num, e);
                }
                Err(e) => {
                    return Err(Error::Extraction(format!("page {}: {}", page_num, e)));
                }
            }
        }

        log::info!(
            "Extracted {} fragments from {} pages",
            fragments.len(),
            pages.len()
        );

        Ok(ExtractedDocument {
            pages,
            fragments,
            metadata,
        })
    }
}

impl Extractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        sniff_path(path)?;
        let doc = LopdfDocument::load(path).map_err(map_load_error)?;
        self.extract_document(&doc)
    }
}

fn map_load_error(e: lopdf::Error) -> Error {
    match e {
        lopdf::Error::Decryption(_) => Error::Encrypted,
        other => Error::from(other),
    }
}

/// Page size from the MediaBox, plus the box's lower-left corner.
fn page_geometry(doc: &LopdfDocument, page_id: lopdf::ObjectId, index: u32) -> (PageGeometry, (f32, f32)) {
    let media_box = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|dict| inherited_media_box(doc, dict));

    match media_box {
        Some([x0, y0, x1, y1]) if x1 > x0 && y1 > y0 => {
            (PageGeometry::new(index, x1 - x0, y1 - y0), (x0, y0))
        }
        _ => (
            PageGeometry::new(index, DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT),
            (0.0, 0.0),
        ),
    }
}

/// MediaBox of a page or of the nearest ancestor in the page tree.
fn inherited_media_box(doc: &LopdfDocument, dict: &Dictionary) -> Option<[f32; 4]> {
    let mut current = dict;
    // Bounded walk; page trees are shallow and a cycle must not hang us
    for _ in 0..32 {
        if let Ok(obj) = current.get(b"MediaBox") {
            let obj = match obj {
                Object::Reference(r) => doc.get_object(*r).ok()?,
                other => other,
            };
            let array = obj.as_array().ok()?;
            if array.len() < 4 {
                return None;
            }
            let mut values = [0.0f32; 4];
            for (slot, value) in values.iter_mut().zip(array) {
                *slot = value.as_float().ok()?;
            }
            return Some(values);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn extract_metadata(doc: &LopdfDocument) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::with_version(doc.version.to_string());

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| info.as_reference().ok())
        .and_then(|r| doc.get_dictionary(r).ok());

    if let Some(info) = info {
        metadata.title = get_string_from_dict(info, b"Title");
        metadata.author = get_string_from_dict(info, b"Author");
        metadata.subject = get_string_from_dict(info, b"Subject");
        metadata.creator = get_string_from_dict(info, b"Creator");
        metadata.producer = get_string_from_dict(info, b"Producer");
        metadata.created = get_string_from_dict(info, b"CreationDate")
            .as_deref()
            .and_then(parse_pdf_date);
    }

    metadata.encrypted = doc.is_encrypted();
    metadata
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => match bytes.as_slice() {
            [0xFE, 0xFF, rest @ ..] => {
                let utf16: Vec<u16> = rest
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()?
            }
            bytes => std::str::from_utf8(bytes)
                .map(str::to_string)
                .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect()),
        },
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok()?,
        _ => return None,
    };

    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 {
        return None;
    }

    let field = |range: std::ops::Range<usize>, default: u32| {
        s.get(range).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let year: i32 = s.get(0..4)?.parse().ok()?;

    chrono::NaiveDate::from_ymd_opt(year, field(4..6, 1), field(6..8, 1))
        .and_then(|date| date.and_hms_opt(field(8..10, 0), field(10..12, 0), field(12..14, 0)))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}

//! Integration tests for lopdf-backed extraction.

mod common;

use common::{build_pdf, sample_paper, write_file};
use supergrobid::error::Error;
use supergrobid::{extract_file, is_pdf, ExtractOptions, Extractor, LopdfExtractor};

#[test]
fn test_extract_sample_paper() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "paper.pdf", &sample_paper());
    assert!(is_pdf(&path));

    let doc = extract_file(&path).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.metadata.page_count, 2);
    assert_eq!(doc.metadata.title.as_deref(), Some("Hybrid Parsing"));
    assert_eq!(doc.metadata.author.as_deref(), Some("A. Author"));
    assert!(!doc.metadata.encrypted);

    let texts: Vec<&str> = doc.fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts.first(), Some(&"Introduction"));
    assert!(texts.contains(&"We align extracted text with a scaffold."));
    assert!(texts.contains(&"[3] C. Author. Third paper. 2021."));
}

#[test]
fn test_fragments_in_reading_order() {
    let doc = LopdfExtractor::new().extract_bytes(&sample_paper()).unwrap();

    for pair in doc.fragments.windows(2) {
        assert!(pair[0].seq < pair[1].seq);
        assert!(pair[0].page <= pair[1].page);
    }
    for fragment in &doc.fragments {
        let page = &doc.pages[fragment.page as usize];
        assert!(fragment.bbox.is_valid());
        assert!(fragment.bbox.x1 <= page.width + 1.0);
        assert!(fragment.bbox.y1 <= page.height + 1.0);
    }

    // Top-left origin: the heading sits above the body on page one
    let heading = &doc.fragments[0];
    let body = &doc.fragments[1];
    assert!(heading.bbox.y0 < body.bbox.y0);
    assert_eq!(doc.page_fragments(1).count(), 4);
}

#[test]
fn test_table_cells_split_on_wide_gaps() {
    let doc = LopdfExtractor::new().extract_bytes(&sample_paper()).unwrap();
    let model = doc.fragments.iter().find(|f| f.text == "Model").unwrap();
    let score = doc.fragments.iter().find(|f| f.text == "Score").unwrap();
    assert_eq!(score.seq, model.seq + 1);
    assert!(score.bbox.x0 > model.bbox.x1);

    // A gap factor wide enough to keep the row as one fragment
    let joined = LopdfExtractor::with_options(ExtractOptions::new().with_cell_gap_factor(100.0))
        .extract_bytes(&sample_paper())
        .unwrap();
    assert!(joined.fragments.iter().any(|f| f.text == "Model Score"));
}

#[test]
fn test_font_statistics() {
    let doc = LopdfExtractor::new().extract_bytes(&sample_paper()).unwrap();
    let fonts = doc.font_statistics();
    assert_eq!(fonts.body_size, 10.0);
    assert_eq!(fonts.heading_sizes, vec![18.0]);
    assert_eq!(fonts.heading_level(18.0), 1);
    assert_eq!(fonts.heading_level(10.0), 0);
}

#[test]
fn test_blank_page_has_no_fragments() {
    let bytes = build_pdf("Blank", &[&[], &[(10.0, 72.0, 700.0, "Only text")]]);
    let doc = LopdfExtractor::new().extract_bytes(&bytes).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.page_fragments(0).count(), 0);
    assert_eq!(doc.fragments.len(), 1);
    assert_eq!(doc.fragments[0].page, 1);
}

#[test]
fn test_non_pdf_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "notes.pdf", b"just some text");
    assert!(!is_pdf(&path));
    assert!(matches!(LopdfExtractor::new().extract(&path), Err(Error::UnknownFormat)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = extract_file("does/not/exist.pdf").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

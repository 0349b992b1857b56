//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One line of text: font size, x, baseline y (PDF space, bottom-up), text.
pub type Line<'a> = (f32, f32, f32, &'a str);

/// Build a letter-size PDF with one Helvetica text line per entry.
pub fn build_pdf(title: &str, pages: &[&[Line<'_>]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for &(size, x, y, text) in lines.iter() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Author" => Object::string_literal("A. Author"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A two-page paper: heading, body, a small table and references.
pub fn sample_paper() -> Vec<u8> {
    let page_one: &[Line<'_>] = &[
        (18.0, 72.0, 720.0, "Introduction"),
        (10.0, 72.0, 690.0, "We align extracted text with a scaffold."),
        (10.0, 72.0, 676.0, "Every output string is verified."),
        (10.0, 72.0, 600.0, "Model"),
        (10.0, 300.0, 600.0, "Score"),
        (10.0, 72.0, 585.0, "Base"),
        (10.0, 300.0, 585.0, "0.91"),
        (10.0, 72.0, 570.0, "Large"),
        (10.0, 300.0, 570.0, "0.95"),
        (10.0, 72.0, 500.0, "The table compares two models."),
    ];
    let page_two: &[Line<'_>] = &[
        (18.0, 72.0, 720.0, "References"),
        (10.0, 72.0, 690.0, "[1] A. Author. First paper. 2019."),
        (10.0, 72.0, 676.0, "[2] B. Author. Second paper. 2020."),
        (10.0, 72.0, 662.0, "[3] C. Author. Third paper. 2021."),
    ];
    build_pdf("Hybrid Parsing", &[page_one, page_two])
}

/// Scaffold for `sample_paper`, with one invented paragraph.
pub const SAMPLE_SCAFFOLD: &str = "# Introduction

We align extracted text with a scaffold. Every output string is verified.

Quantum chromodynamics describes gluon confinement in hadrons.

| Model | Score |
|---|---|
| Base | 0.91 |
| Large | 0.95 |

The table compares two models.

# References

[1] A. Author. First paper. 2019.

[2] B. Author. Second paper. 2020.

[3] C. Author. Third paper. 2021.
";

/// Write bytes to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

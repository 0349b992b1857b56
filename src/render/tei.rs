//! TEI XML rendering.
//!
//! Body elements go to `<text><body>`, citations to `<text><back><listBibl>`.
//! Placeholders without content become `<figure>` elements whose `<desc>`
//! carries the unresolved marker.

use quick_xml::escape::escape;

use crate::error::Result;
use crate::model::{Citation, ElementKind, ReconciledElement, ResolvedContent, TableGrid};
use crate::pipeline::ProcessedDocument;

use super::{marker_text, RenderOptions};

const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

/// Convert a processed document to TEI XML.
pub fn to_tei(doc: &ProcessedDocument, options: &RenderOptions) -> Result<String> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!("<TEI xmlns=\"{}\">\n", TEI_NS));

    write_header(&mut xml, doc);

    xml.push_str("  <text>\n    <body>\n");
    let mut in_list = false;
    let mut citations: Vec<&Citation> = Vec::new();
    for element in &doc.elements {
        let is_item = element.kind == ElementKind::ListItem;
        if in_list && !is_item {
            xml.push_str("      </list>\n");
        }
        if is_item && !in_list {
            xml.push_str("      <list>\n");
        }
        in_list = is_item;

        if let Some(ResolvedContent::References { citations: found }) = element.resolved() {
            citations.extend(found.iter());
            continue;
        }
        write_element(&mut xml, element, options);
    }
    if in_list {
        xml.push_str("      </list>\n");
    }
    xml.push_str("    </body>\n");

    if !citations.is_empty() {
        xml.push_str("    <back>\n      <listBibl>\n");
        for citation in citations {
            write_citation(&mut xml, citation);
        }
        xml.push_str("      </listBibl>\n    </back>\n");
    }
    xml.push_str("  </text>\n</TEI>\n");

    Ok(xml)
}

fn write_header(xml: &mut String, doc: &ProcessedDocument) {
    let title = doc.metadata.title.as_deref().unwrap_or("");
    xml.push_str("  <teiHeader>\n    <fileDesc>\n      <titleStmt>\n");
    xml.push_str(&format!("        <title level=\"a\" type=\"main\">{}</title>\n", escape(title)));
    if let Some(author) = doc.metadata.author.as_deref() {
        xml.push_str(&format!("        <author>{}</author>\n", escape(author)));
    }
    xml.push_str("      </titleStmt>\n");
    xml.push_str("      <sourceDesc>\n");
    xml.push_str(&format!(
        "        <bibl>{}</bibl>\n",
        escape(&doc.report.source.display().to_string())
    ));
    xml.push_str("      </sourceDesc>\n    </fileDesc>\n  </teiHeader>\n");
}

fn write_element(xml: &mut String, element: &ReconciledElement, options: &RenderOptions) {
    let coords = if options.include_bbox {
        match (element.page(), element.bbox()) {
            (Some(page), Some(b)) => format!(
                " coords=\"{},{:.1},{:.1},{:.1},{:.1}\"",
                page + 1,
                b.x0,
                b.y0,
                b.width(),
                b.height()
            ),
            _ => String::new(),
        }
    } else {
        String::new()
    };
    let text = element.text.as_deref().map(|t| escape(t).into_owned());

    match (element.kind, element.resolved()) {
        (ElementKind::Heading, _) => {
            if let Some(text) = text {
                let level = element.level.map(|l| format!(" n=\"{}\"", l)).unwrap_or_default();
                xml.push_str(&format!("      <head{}{}>{}</head>\n", level, coords, text));
            }
        }
        (ElementKind::Paragraph, _) => {
            if let Some(text) = text {
                xml.push_str(&format!("      <p{}>{}</p>\n", coords, text));
            }
        }
        (ElementKind::ListItem, _) => {
            if let Some(text) = text {
                xml.push_str(&format!("        <item{}>{}</item>\n", coords, text));
            }
        }
        (ElementKind::Table, Some(ResolvedContent::Table(grid))) => write_table(xml, grid, &coords),
        (ElementKind::Equation, Some(ResolvedContent::Equation(eq))) => {
            xml.push_str(&format!(
                "      <formula notation=\"{}\"{}>{}</formula>\n",
                escape(&eq.notation),
                coords,
                escape(&eq.markup)
            ));
        }
        _ => {
            let kind = match element.kind {
                ElementKind::Table => " type=\"table\"",
                ElementKind::Equation => " type=\"formula\"",
                ElementKind::ReferenceList => " type=\"references\"",
                _ => "",
            };
            xml.push_str(&format!("      <figure{}{}>\n", kind, coords));
            xml.push_str(&format!("        <desc>{}</desc>\n", escape(&marker_text(element))));
            if let Some(text) = text {
                xml.push_str(&format!("        <p>{}</p>\n", text));
            }
            xml.push_str("      </figure>\n");
        }
    }
}

fn write_table(xml: &mut String, grid: &TableGrid, coords: &str) {
    let method = if grid.verified { "grid" } else { "generative" };
    xml.push_str(&format!(
        "      <figure type=\"table\"{}>\n        <table rend=\"{}\">\n",
        coords, method
    ));
    for (i, row) in grid.rows.iter().enumerate() {
        if i < grid.header_rows as usize {
            xml.push_str("          <row role=\"label\">");
        } else {
            xml.push_str("          <row>");
        }
        for cell in row {
            xml.push_str(&format!("<cell>{}</cell>", escape(cell)));
        }
        xml.push_str("</row>\n");
    }
    xml.push_str("        </table>\n");
    if !grid.verified {
        xml.push_str("        <note type=\"unverified\">generative transcription</note>\n");
    }
    xml.push_str("      </figure>\n");
}

fn write_citation(xml: &mut String, citation: &Citation) {
    let Some(fields) = &citation.fields else {
        xml.push_str(&format!("        <bibl>{}</bibl>\n", escape(&citation.raw)));
        return;
    };

    xml.push_str("        <biblStruct>\n          <analytic>\n");
    if let Some(title) = &fields.title {
        xml.push_str(&format!("            <title level=\"a\">{}</title>\n", escape(title)));
    }
    for author in &fields.authors {
        xml.push_str(&format!(
            "            <author><persName>{}</persName></author>\n",
            escape(author)
        ));
    }
    if let Some(doi) = &fields.doi {
        xml.push_str(&format!("            <idno type=\"DOI\">{}</idno>\n", escape(doi)));
    }
    xml.push_str("          </analytic>\n          <monogr>\n");
    if let Some(venue) = &fields.venue {
        xml.push_str(&format!("            <title level=\"m\">{}</title>\n", escape(venue)));
    }
    xml.push_str("            <imprint>");
    if let Some(year) = &fields.year {
        xml.push_str(&format!("<date when=\"{}\">{}</date>", escape(year), escape(year)));
    }
    xml.push_str("</imprint>\n          </monogr>\n");
    xml.push_str(&format!("          <note type=\"raw_reference\">{}</note>\n", escape(&citation.raw)));
    xml.push_str("        </biblStruct>\n");
}

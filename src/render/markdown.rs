//! Markdown rendering for processed documents.

use crate::error::Result;
use crate::extract::FontStatistics;
use crate::model::{escape_yaml, ElementKind, ReconciledElement, ResolvedContent, TableGrid};
use crate::pipeline::ProcessedDocument;

use super::{marker_text, RenderOptions};

/// Convert a processed document to Markdown.
pub fn to_markdown(doc: &ProcessedDocument, options: &RenderOptions) -> Result<String> {
    MarkdownRenderer::new(options.clone()).render(doc)
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
    fonts: FontStatistics,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            fonts: FontStatistics::default(),
        }
    }

    /// Render a document to Markdown.
    pub fn render(mut self, doc: &ProcessedDocument) -> Result<String> {
        self.fonts = doc.font_statistics();
        let mut output = String::new();

        if self.options.include_frontmatter {
            self.render_frontmatter(&mut output, doc);
        }

        let mut in_list = false;
        for element in &doc.elements {
            let is_item = element.kind == ElementKind::ListItem;
            if in_list && !is_item {
                output.push('\n');
            }
            in_list = is_item;
            self.render_element(&mut output, element);
        }

        Ok(output.trim().to_string())
    }

    fn render_frontmatter(&self, output: &mut String, doc: &ProcessedDocument) {
        output.push_str("---\n");
        output.push_str(&format!(
            "source: \"{}\"\n",
            escape_yaml(&doc.report.source.display().to_string())
        ));
        for line in doc.metadata.yaml_lines() {
            output.push_str(&line);
            output.push('\n');
        }
        let flags: Vec<&str> = doc.report.quality_flags().into_iter().map(|f| f.as_str()).collect();
        output.push_str(&format!("quality: [{}]\n", flags.join(", ")));
        output.push_str("---\n\n");
    }

    fn render_element(&self, output: &mut String, element: &ReconciledElement) {
        match element.kind {
            ElementKind::Heading => self.render_heading(output, element),
            ElementKind::Paragraph => {
                if let Some(text) = element.text.as_deref() {
                    output.push_str(&self.escape(text));
                    output.push_str("\n\n");
                }
            }
            ElementKind::ListItem => {
                if let Some(text) = element.text.as_deref() {
                    output.push_str("- ");
                    output.push_str(&self.escape(strip_list_marker(text)));
                    output.push('\n');
                }
            }
            ElementKind::Figure => push_marker(output, element),
            ElementKind::Table | ElementKind::Equation | ElementKind::ReferenceList => {
                self.render_resolvable(output, element)
            }
        }
        if self.options.include_bbox {
            if let (Some(page), Some(b)) = (element.page(), element.bbox()) {
                output.push_str(&format!(
                    "<!-- page {} bbox [{:.1}, {:.1}, {:.1}, {:.1}] -->\n\n",
                    page + 1,
                    b.x0,
                    b.y0,
                    b.x1,
                    b.y1
                ));
            }
        }
    }

    fn render_heading(&self, output: &mut String, element: &ReconciledElement) {
        let Some(text) = element.text.as_deref() else {
            return;
        };
        let level = self
            .heading_level(element)
            .clamp(1, self.options.max_heading_level.max(1));
        output.push_str(&"#".repeat(level as usize));
        output.push(' ');
        output.push_str(&self.escape(text));
        output.push_str("\n\n");
    }

    /// Scaffold depth first, then font size against body text.
    fn heading_level(&self, element: &ReconciledElement) -> u8 {
        if let Some(level) = element.level {
            return level;
        }
        let config = &self.options.heading_config;
        if !config.use_font_sizes {
            return config.fallback_level;
        }
        let size = element
            .fragments
            .iter()
            .filter_map(|f| f.font_size)
            .fold(None, |max: Option<f32>, s| Some(max.map_or(s, |m| m.max(s))));
        match size.map(|s| self.fonts.heading_level(s)) {
            Some(level) if level > 0 => level,
            _ => config.fallback_level,
        }
    }

    fn render_resolvable(&self, output: &mut String, element: &ReconciledElement) {
        match element.resolved() {
            Some(ResolvedContent::Table(grid)) => self.render_table(output, grid),
            Some(ResolvedContent::Equation(eq)) => {
                output.push_str("$$\n");
                output.push_str(&eq.markup);
                output.push_str("\n$$\n\n");
            }
            Some(ResolvedContent::References { citations }) => {
                for citation in citations {
                    output.push_str("- ");
                    output.push_str(&self.escape(&citation.raw));
                    output.push('\n');
                }
                output.push('\n');
            }
            None => {
                push_marker(output, element);
                // Verified reference text survives a failed segmentation
                if let Some(text) = element.text.as_deref() {
                    output.push_str(&self.escape(text));
                    output.push_str("\n\n");
                }
            }
        }
    }

    fn render_table(&self, output: &mut String, grid: &TableGrid) {
        let columns = grid.column_count();
        if columns == 0 {
            return;
        }
        if !grid.verified {
            output.push_str("<!-- unverified table: generative transcription -->\n");
        }

        let header_rows = (grid.header_rows as usize).max(1);
        for (i, row) in grid.rows.iter().enumerate() {
            output.push('|');
            for c in 0..columns {
                let cell = row.get(c).map(String::as_str).unwrap_or("");
                output.push_str(&format!(" {} |", escape_cell(cell)));
            }
            output.push('\n');

            if i + 1 == header_rows {
                output.push('|');
                output.push_str(&" --- |".repeat(columns));
                output.push('\n');
            }
        }
        output.push('\n');
    }

    fn escape(&self, text: &str) -> String {
        if self.options.escape_special_chars {
            escape_markdown(text)
        } else {
            text.to_string()
        }
    }
}

fn push_marker(output: &mut String, element: &ReconciledElement) {
    output.push_str("<!-- ");
    output.push_str(&marker_text(element).replace("--", "- -"));
    output.push_str(" -->\n\n");
}

/// Drop a leading bullet; the renderer adds its own.
fn strip_list_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    for marker in ["•", "-", "*", "–", "·"] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    text
}

/// Escape special Markdown characters.
/// Only characters that would change the meaning of extracted text are escaped.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

fn escape_cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BBox, Citation, DocumentMetadata, DocumentReport, EquationMarkup, Fragment, InferredRegion,
        PageGeometry, RegionSource, Resolution,
    };

    fn frag(text: &str, y: f32, size: f32, seq: usize) -> Fragment {
        Fragment::new(0, BBox::new(72.0, y, 540.0, y + size), text, seq).with_font_size(size)
    }

    fn text_element(kind: ElementKind, text: &str, size: f32, seq: usize) -> ReconciledElement {
        ReconciledElement::matched(kind, vec![frag(text, 100.0 + seq as f32 * 20.0, size, seq)], 1.0, seq)
    }

    fn placeholder(kind: ElementKind) -> ReconciledElement {
        let region = InferredRegion::new(0, BBox::new(0.0, 200.0, 612.0, 300.0), RegionSource::Interpolated);
        ReconciledElement::placeholder(kind, region, 9)
    }

    fn doc(elements: Vec<ReconciledElement>) -> ProcessedDocument {
        ProcessedDocument::new(
            DocumentMetadata::default(),
            vec![PageGeometry::letter(0)],
            elements,
            DocumentReport::begin("paper.pdf"),
        )
    }

    #[test]
    fn test_heading_levels() {
        let mut scaffolded = text_element(ElementKind::Heading, "Method", 10.0, 0);
        scaffolded.level = Some(3);
        let big = text_element(ElementKind::Heading, "Title", 18.0, 1);
        let plain = text_element(ElementKind::Heading, "Aside", 10.0, 2);
        let body = text_element(ElementKind::Paragraph, "Body text.", 10.0, 3);
        let body2 = text_element(ElementKind::Paragraph, "More body.", 10.0, 4);

        let md = to_markdown(&doc(vec![scaffolded, big, plain, body, body2]), &RenderOptions::new()).unwrap();
        assert!(md.contains("### Method\n"));
        assert!(md.contains("# Title\n"));
        assert!(md.contains("## Aside\n"));
        assert!(md.contains("Body text.\n\nMore body."));
    }

    #[test]
    fn test_list_items_grouped() {
        let elements = vec![
            text_element(ElementKind::ListItem, "• first", 10.0, 0),
            text_element(ElementKind::ListItem, "second", 10.0, 1),
            text_element(ElementKind::Paragraph, "After.", 10.0, 2),
        ];
        let md = to_markdown(&doc(elements), &RenderOptions::new()).unwrap();
        assert_eq!(md, "- first\n- second\n\nAfter.");
    }

    #[test]
    fn test_unresolved_markers() {
        let mut equation = placeholder(ElementKind::Equation);
        equation
            .attach(
                1,
                Resolution::Unresolved {
                    reason: "no equation transcriber configured".into(),
                },
            )
            .unwrap();
        let md = to_markdown(
            &doc(vec![placeholder(ElementKind::Figure), equation, placeholder(ElementKind::Table)]),
            &RenderOptions::new(),
        )
        .unwrap();

        assert!(md.contains("<!-- figure, page 1, region [0, 200, 612, 300] (interpolated) -->"));
        assert!(md.contains("<!-- unresolved equation, page 1"));
        assert!(md.contains("no equation transcriber configured -->"));
        assert!(md.contains("<!-- unresolved table, page 1"));
    }

    #[test]
    fn test_resolved_content() {
        let mut table = placeholder(ElementKind::Table);
        table
            .attach(
                0,
                Resolution::Resolved {
                    content: ResolvedContent::Table(TableGrid::generated(vec![
                        vec!["Model".into(), "BLEU".into()],
                        vec!["Base".into(), "27.3".into()],
                    ])),
                },
            )
            .unwrap();
        let mut equation = placeholder(ElementKind::Equation);
        equation
            .attach(
                1,
                Resolution::Resolved {
                    content: ResolvedContent::Equation(EquationMarkup::latex("E = mc^2")),
                },
            )
            .unwrap();
        let mut refs = text_element(ElementKind::Paragraph, "[1] A. 2017.", 10.0, 2);
        refs.kind = ElementKind::ReferenceList;
        refs.attach(
            2,
            Resolution::Resolved {
                content: ResolvedContent::References {
                    citations: vec![Citation::raw("[1] A. 2017.")],
                },
            },
        )
        .unwrap();

        let md = to_markdown(&doc(vec![table, equation, refs]), &RenderOptions::new()).unwrap();
        assert!(md.contains("<!-- unverified table: generative transcription -->\n| Model | BLEU |\n| --- | --- |\n| Base | 27.3 |"));
        assert!(md.contains("$$\nE = mc^2\n$$"));
        assert!(md.contains("- \\[1\\] A. 2017."));
    }

    #[test]
    fn test_unresolved_reference_keeps_text() {
        let mut refs = text_element(ElementKind::Paragraph, "Smith 2020", 10.0, 0);
        refs.kind = ElementKind::ReferenceList;
        let md = to_markdown(&doc(vec![refs]), &RenderOptions::new()).unwrap();
        assert!(md.starts_with("<!-- unresolved references, page 1: resolver disabled -->"));
        assert!(md.ends_with("Smith 2020"));
    }

    #[test]
    fn test_frontmatter() {
        let mut d = doc(vec![text_element(ElementKind::Paragraph, "Hi", 10.0, 0)]);
        d.metadata.title = Some("Paper".into());
        d.report.unverified_tables = 1;
        let md = to_markdown(&d, &RenderOptions::new().with_frontmatter(true)).unwrap();
        assert!(md.starts_with("---\nsource: \"paper.pdf\"\ntitle: \"Paper\"\n"));
        assert!(md.contains("quality: [unverified_tables]\n---\n\nHi"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("a_b [c]"), "a\\_b \\[c\\]");
        assert_eq!(escape_cell("a|b\n"), "a\\|b");
    }
}

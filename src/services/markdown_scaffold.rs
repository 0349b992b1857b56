//! Scaffolds from Nougat-style Markdown (`.mmd`).

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ScaffoldGenerator, ServiceError};
use crate::model::{ElementKind, ScaffoldElement};

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*+]|\d{1,3}[.)])\s+(.+)$").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[([^\]]*)\]\([^)]*\)").unwrap());

/// Closing marker for a multi-line block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Table(&'static str),
    Equation(&'static str),
}

struct ScaffoldBuilder {
    elements: Vec<ScaffoldElement>,
    paragraph: Vec<String>,
    table: Vec<String>,
}

impl ScaffoldBuilder {
    fn push(&mut self, kind: ElementKind, text: String, level: Option<u8>) {
        let seq = self.elements.len();
        let mut element = ScaffoldElement::new(kind, text, seq);
        element.level = level;
        self.elements.push(element);
    }

    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let text = self.paragraph.join(" ");
            self.paragraph.clear();
            self.push(ElementKind::Paragraph, text, None);
        }
    }

    fn flush_table(&mut self) {
        if !self.table.is_empty() {
            let text = self.table.join("\n");
            self.table.clear();
            self.push(ElementKind::Table, text, None);
        }
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_table();
    }
}

/// Parse Markdown into an ordered scaffold.
///
/// Headings, list items and paragraphs carry text for alignment. Tables,
/// display equations and images become placeholders whose text is kept only
/// as a hint; it never reaches the output.
pub fn parse_markdown_scaffold(markdown: &str) -> Vec<ScaffoldElement> {
    let mut builder = ScaffoldBuilder {
        elements: Vec::new(),
        paragraph: Vec::new(),
        table: Vec::new(),
    };
    let mut open: Option<(Block, Vec<String>)> = None;

    for raw in markdown.lines() {
        let line = raw.trim();

        if let Some((block, mut body)) = open.take() {
            let (close, kind) = match block {
                Block::Table(close) => (close, ElementKind::Table),
                Block::Equation(close) => (close, ElementKind::Equation),
            };
            if let Some(rest) = line.strip_suffix(close) {
                body.push(rest.to_string());
                builder.push(kind, body.join("\n").trim().to_string(), None);
            } else {
                body.push(line.to_string());
                open = Some((block, body));
            }
            continue;
        }

        if line.is_empty() {
            builder.flush();
            continue;
        }

        if line.starts_with("[MISSING_PAGE") {
            builder.flush();
            continue;
        }

        if line.starts_with('|') {
            builder.flush_paragraph();
            builder.table.push(line.to_string());
            continue;
        }
        builder.flush_table();

        if let Some((block, opener)) = block_opener(line) {
            builder.flush_paragraph();
            let rest = &line[opener.len()..];
            let close = match block {
                Block::Table(c) | Block::Equation(c) => c,
            };
            let kind = match block {
                Block::Table(_) => ElementKind::Table,
                Block::Equation(_) => ElementKind::Equation,
            };
            match rest.strip_suffix(close) {
                Some(inner) if !rest.is_empty() => {
                    builder.push(kind, inner.trim().to_string(), None);
                }
                _ => open = Some((block, vec![rest.to_string()])),
            }
            continue;
        }

        if line.starts_with('#') {
            builder.flush_paragraph();
            let hashes = line.chars().take_while(|&c| c == '#').count();
            let text = strip_emphasis(line[hashes..].trim());
            if !text.is_empty() {
                builder.push(ElementKind::Heading, text, Some(hashes.min(6) as u8));
            }
            continue;
        }

        if let Some(caps) = IMAGE.captures(line) {
            builder.flush_paragraph();
            builder.push(ElementKind::Figure, caps[1].trim().to_string(), None);
            continue;
        }

        if let Some(caps) = LIST_ITEM.captures(line) {
            // A bold run at line start is emphasis, not a bullet
            if !line.starts_with("**") {
                builder.flush_paragraph();
                builder.push(ElementKind::ListItem, strip_emphasis(&caps[1]), None);
                continue;
            }
        }

        builder.paragraph.push(strip_emphasis(line));
    }

    if let Some((block, body)) = open {
        let kind = match block {
            Block::Table(_) => ElementKind::Table,
            Block::Equation(_) => ElementKind::Equation,
        };
        builder.push(kind, body.join("\n").trim().to_string(), None);
    }
    builder.flush();

    builder.elements
}

/// Multi-line block opened by this line, with the opening token.
fn block_opener(line: &str) -> Option<(Block, &'static str)> {
    const OPENERS: [(&str, Block); 5] = [
        ("$$", Block::Equation("$$")),
        ("\\[", Block::Equation("\\]")),
        ("\\begin{equation}", Block::Equation("\\end{equation}")),
        ("\\begin{table}", Block::Table("\\end{table}")),
        ("\\begin{tabular}", Block::Table("\\end{tabular}")),
    ];
    OPENERS
        .iter()
        .find(|(open, _)| line.starts_with(open))
        .map(|(open, block)| (*block, *open))
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "").trim().to_string()
}

/// Reads a scaffold from a Markdown file.
///
/// Without an explicit path, looks for `<stem>.mmd` (then `<stem>.md`) next
/// to the PDF.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFileScaffold {
    path: Option<PathBuf>,
}

impl MarkdownFileScaffold {
    /// Always read this file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Read the sibling of each PDF.
    pub fn sibling() -> Self {
        Self { path: None }
    }

    fn locate(&self, pdf: &Path) -> Option<PathBuf> {
        if let Some(ref path) = self.path {
            return Some(path.clone());
        }
        ["mmd", "md"]
            .iter()
            .map(|ext| pdf.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }
}

impl ScaffoldGenerator for MarkdownFileScaffold {
    fn infer_structure(&self, pdf: &Path) -> Result<Vec<ScaffoldElement>, ServiceError> {
        let path = self.locate(pdf).ok_or_else(|| {
            ServiceError::Unavailable(format!("no scaffold file next to {}", pdf.display()))
        })?;
        let markdown = std::fs::read_to_string(&path).map_err(|e| {
            ServiceError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let elements = parse_markdown_scaffold(&markdown);
        log::debug!("{} scaffold elements from {}", elements.len(), path.display());
        Ok(elements)
    }
}

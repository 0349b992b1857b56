//! Layout analysis for PDF pages.
//!
//! Content streams are decoded into positioned spans, spans are grouped into
//! lines in reading order, and lines are cut into fragments wherever a wide
//! horizontal gap separates their spans. Coordinates stay in PDF user space
//! (y grows upward) until [`page_fragments`] converts them to page space.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{BBox, Fragment, PageGeometry};

/// Average glyph advance as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.5;

/// A text span with position and size.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span; the width is estimated from the character count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32) -> Self {
        let width = text.chars().count() as f32 * font_size * AVG_CHAR_WIDTH;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }
}

/// Spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        if spans.is_empty() {
            return Self {
                spans,
                y: 0.0,
                x: 0.0,
                font_size: 0.0,
            };
        }

        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let font_size = dominant_size(&spans);
        let y = spans[0].y;
        let x = spans[0].x;

        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Split the line wherever the gap between neighbouring spans exceeds
    /// `gap_factor` times the line's font size.
    pub fn segments(&self, gap_factor: f32) -> Vec<&[TextSpan]> {
        let mut segments = Vec::new();
        if self.spans.is_empty() {
            return segments;
        }

        let threshold = gap_factor * self.font_size.max(1.0);
        let mut start = 0;
        for i in 1..self.spans.len() {
            let gap = self.spans[i].x - self.spans[i - 1].right();
            if gap > threshold {
                segments.push(&self.spans[start..i]);
                start = i;
            }
        }
        segments.push(&self.spans[start..]);
        segments
    }

    /// Combined text of all spans.
    pub fn text(&self) -> String {
        join_spans(&self.spans)
    }
}

/// Font size weighted by text length.
fn dominant_size(spans: &[TextSpan]) -> f32 {
    let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
    if total_chars == 0 {
        return spans.first().map(|s| s.font_size).unwrap_or(0.0);
    }
    let weighted: f32 = spans
        .iter()
        .map(|s| s.font_size * s.text.len() as f32)
        .sum();
    weighted / total_chars as f32
}

/// Join spans, inserting a space where the X gap suggests a word break.
///
/// No space is inserted between characters of scripts that do not use word spaces.
fn join_spans(spans: &[TextSpan]) -> String {
    let mut result = String::new();

    for (i, span) in spans.iter().enumerate() {
        if i == 0 {
            result.push_str(&span.text);
            continue;
        }

        let prev = &spans[i - 1];
        let gap = span.x - prev.right();

        let char_count = span.text.chars().count();
        let avg_char_width = if char_count > 0 && span.width > 0.0 {
            span.width / char_count as f32
        } else {
            span.font_size * AVG_CHAR_WIDTH
        };

        let spaceless = prev
            .text
            .chars()
            .last()
            .map(is_spaceless_script_char)
            .unwrap_or(false)
            && span
                .text
                .chars()
                .next()
                .map(is_spaceless_script_char)
                .unwrap_or(false);

        let has_space = prev.text.ends_with([' ', '\u{00A0}'])
            || span.text.starts_with([' ', '\u{00A0}']);

        if gap > avg_char_width * 0.2 && !spaceless && !has_space {
            result.push(' ');
        }

        result.push_str(&span.text);
    }

    result
}

/// A detected column in the page layout.
#[derive(Debug, Clone)]
pub struct Column {
    /// Left boundary X coordinate
    pub left: f32,
    /// Right boundary X coordinate
    pub right: f32,
    /// Column index (0 = leftmost)
    pub index: usize,
}

impl Column {
    /// Check if an X coordinate falls within this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// A span belongs to a column if its left edge or its center is inside.
    pub fn contains_span(&self, span: &TextSpan) -> bool {
        let center = span.x + span.width / 2.0;
        self.contains(span.x) || self.contains(center)
    }
}

/// Font size statistics for heading levels.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common)
    pub body_size: f32,
    /// Font sizes larger than body, largest first
    pub heading_sizes: Vec<f32>,
    /// All observed font sizes with frequency
    pub size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    /// Collect and analyze sizes in one step.
    pub fn from_sizes(sizes: impl IntoIterator<Item = f32>) -> Self {
        let mut stats = Self::default();
        for size in sizes {
            stats.add_size(size);
        }
        stats.analyze();
        stats
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Calculate body size and heading sizes.
    pub fn analyze(&mut self) {
        // Ties on frequency go to the smaller size so the result is stable.
        let body = self
            .size_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(key, _)| *key);

        let Some(body_key) = body else {
            self.body_size = 12.0;
            self.heading_sizes.clear();
            return;
        };
        self.body_size = body_key as f32 / 10.0;

        let mut larger: Vec<f32> = self
            .size_histogram
            .keys()
            .map(|k| *k as f32 / 10.0)
            .filter(|size| *size > self.body_size + 0.5)
            .collect();
        larger.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        self.heading_sizes = larger;
    }

    /// Heading level for a font size (1-6, or 0 for body text).
    pub fn heading_level(&self, font_size: f32) -> u8 {
        if font_size < self.body_size + 1.5 {
            return 0;
        }

        for (i, &heading_size) in self.heading_sizes.iter().enumerate() {
            if font_size >= heading_size - 0.5 {
                return (i + 1).min(6) as u8;
            }
        }

        5
    }
}

/// Decodes page content streams into text spans.
pub struct ContentDecoder<'a> {
    doc: &'a LopdfDocument,
}

impl<'a> ContentDecoder<'a> {
    /// Create a decoder over a loaded document.
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self { doc }
    }

    /// Extract text spans from a page with position and font size.
    pub fn page_spans(&self, page_id: ObjectId) -> Result<Vec<TextSpan>> {
        let Some(content) = self.page_content(page_id)? else {
            return Ok(Vec::new());
        };

        let fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        self.decode_spans(&content, &fonts)
    }

    /// Concatenated content streams, or `None` for a page without content.
    fn page_content(&self, page_id: ObjectId) -> Result<Option<Vec<u8>>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(None);
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => s
                    .decompressed_content()
                    .map(Some)
                    .map_err(|e| Error::PdfParse(e.to_string())),
                Ok(Object::Array(arr)) => Ok(Some(self.concat_streams(arr))),
                _ => Err(Error::PdfParse("invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(Some(self.concat_streams(arr))),
            _ => Err(Error::PdfParse("invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Ok(r) = obj.as_reference() {
                if let Ok(Object::Stream(s)) = self.doc.get_object(r) {
                    if let Ok(data) = s.decompressed_content() {
                        content.extend_from_slice(&data);
                        content.push(b' ');
                    }
                }
            }
        }
        content
    }

    fn decode_spans(
        &self,
        content: &[u8],
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    ) -> Result<Vec<TextSpan>> {
        let content =
            lopdf::content::Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut spans = Vec::new();
        let mut state = TextState::default();
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut in_text_block = false;

        for op in content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => ctm_stack.push(state.ctm),
                "Q" => {
                    if let Some(ctm) = ctm_stack.pop() {
                        state.ctm = ctm;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    state.text = TextMatrix::default();
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if let (Some(Object::Name(name)), Some(size)) =
                        (operands.first(), operands.get(1).and_then(get_number))
                    {
                        state.font = name.clone();
                        state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        state.text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(get_number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(get_number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.text.leading = -ty;
                    }
                    state.text.translate(tx, ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.text.set(m);
                    }
                }
                "T*" => state.text.next_line(),
                "Tj" | "TJ" | "'" | "\"" if in_text_block => {
                    if op.operator == "'" || op.operator == "\"" {
                        state.text.next_line();
                    }
                    let text = match op.operator.as_str() {
                        "TJ" => match operands.first() {
                            Some(Object::Array(items)) => self.decode_array(items, &state, fonts),
                            _ => String::new(),
                        },
                        "\"" => self.decode_operand(operands.get(2), &state, fonts),
                        _ => self.decode_operand(operands.first(), &state, fonts),
                    };

                    if !text.trim().is_empty() {
                        let (x, y) = state.position();
                        spans.push(TextSpan::new(text, x, y, state.effective_size()));
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }

    fn decode_bytes(
        &self,
        bytes: &[u8],
        state: &TextState,
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    ) -> String {
        let encoding = fonts
            .get(&state.font)
            .and_then(|f| f.get_font_encoding(self.doc).ok());

        match encoding {
            Some(ref enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_default(),
            None => decode_text_simple(bytes),
        }
    }

    fn decode_operand(
        &self,
        operand: Option<&Object>,
        state: &TextState,
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    ) -> String {
        match operand {
            Some(Object::String(bytes, _)) => self.decode_bytes(bytes, state, fonts),
            _ => String::new(),
        }
    }

    /// TJ arrays: large negative adjustments (in 1/1000 text space units) are word breaks.
    fn decode_array(
        &self,
        items: &[Object],
        state: &TextState,
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    ) -> String {
        const SPACE_THRESHOLD: f32 = 200.0;

        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    combined.push_str(&self.decode_bytes(bytes, state, fonts));
                }
                other => {
                    let Some(adjustment) = get_number(other).map(|n| -n) else {
                        continue;
                    };
                    let breaks_word = combined
                        .chars()
                        .last()
                        .map(|c| c != ' ' && c != '\u{00A0}' && !is_spaceless_script_char(c))
                        .unwrap_or(false);
                    if adjustment > SPACE_THRESHOLD && breaks_word {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }
}

/// Detect columns in a page based on vertical gap (gutter) detection.
///
/// Returns columns sorted from left to right.
pub fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    if spans.is_empty() {
        return vec![];
    }

    let min_x = spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
    let max_x = spans
        .iter()
        .map(TextSpan::right)
        .fold(f32::NEG_INFINITY, f32::max);
    let single = || {
        vec![Column {
            left: min_x - 10.0,
            right: max_x + 10.0,
            index: 0,
        }]
    };

    let extent = max_x - min_x;
    if extent < 250.0 {
        return single();
    }

    let slice_width = 3.0;
    let num_slices = ((extent / slice_width) as usize) + 1;
    let mut occupancy = vec![0usize; num_slices];

    for span in spans {
        let start = ((span.x - min_x) / slice_width) as usize;
        let end = ((span.right() - min_x) / slice_width) as usize;
        for slot in occupancy
            .iter_mut()
            .take(end.min(num_slices - 1) + 1)
            .skip(start)
        {
            *slot += 1;
        }
    }

    // Search the middle 70% for the widest empty run, preferring runs near the center.
    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let center = num_slices / 2;

    let mut best_start = 0;
    let mut best_len = 0;
    let mut best_center_dist = f32::MAX;
    let mut consider = |start: usize, len: usize| {
        let width = len as f32 * slice_width;
        if width < 10.0 {
            return;
        }
        let dist = ((start + len / 2) as i32 - center as i32).abs() as f32;
        let best_width = best_len as f32 * slice_width;
        if width > best_width * 1.5 || (width >= best_width * 0.7 && dist < best_center_dist) {
            best_start = start;
            best_len = len;
            best_center_dist = dist;
        }
    };

    let mut run_start = 0;
    let mut run_len = 0;
    for (i, &count) in occupancy
        .iter()
        .enumerate()
        .take(search_end)
        .skip(search_start)
    {
        if count == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        } else {
            if run_len > 0 {
                consider(run_start, run_len);
            }
            run_len = 0;
        }
    }
    if run_len > 0 {
        consider(run_start, run_len);
    }

    let gap_width = best_len as f32 * slice_width;
    if gap_width < 12.0 {
        return single();
    }

    let gutter = min_x + (best_start as f32 + best_len as f32 / 2.0) * slice_width;
    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        log::debug!("column too narrow around gutter at x={:.1}", gutter);
        return single();
    }

    let left = spans
        .iter()
        .filter(|s| s.x + s.width / 2.0 < gutter)
        .count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        log::debug!("spans too imbalanced ({} / {}), single column", left, right);
        return single();
    }

    log::debug!("two columns, gutter at x={:.1} ({:.1}pt)", gutter, gap_width);
    vec![
        Column {
            left: min_x - 10.0,
            right: gutter,
            index: 0,
        },
        Column {
            left: gutter,
            right: max_x + 10.0,
            index: 1,
        },
    ]
}

/// Group spans into lines in reading order: the left column top to bottom,
/// then the right column.
pub fn group_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    let columns = detect_columns(&spans);
    if columns.len() <= 1 {
        return group_lines_single_column(spans);
    }

    let mut column_spans: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
    for span in spans {
        let idx = columns
            .iter()
            .position(|c| c.contains_span(&span))
            .unwrap_or(0);
        column_spans[idx].push(span);
    }

    column_spans
        .into_iter()
        .flat_map(group_lines_single_column)
        .collect()
}

fn group_lines_single_column(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Turn one page's spans into fragments in page space.
///
/// `origin` is the lower-left corner of the page's MediaBox. Sequence
/// numbers continue from `next_seq`.
pub fn page_fragments(
    spans: Vec<TextSpan>,
    page: &PageGeometry,
    origin: (f32, f32),
    gap_factor: f32,
    next_seq: &mut usize,
) -> Vec<Fragment> {
    let mut fragments = Vec::new();

    for line in group_lines(spans) {
        for segment in line.segments(gap_factor) {
            let text = join_spans(segment);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let x0 = segment.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
            let x1 = segment
                .iter()
                .map(TextSpan::right)
                .fold(f32::NEG_INFINITY, f32::max);
            let top = segment
                .iter()
                .map(TextSpan::top)
                .fold(f32::NEG_INFINITY, f32::max);
            let bottom = segment
                .iter()
                .map(TextSpan::bottom)
                .fold(f32::INFINITY, f32::min);

            let bbox = BBox::new(
                x0 - origin.0,
                page.height - (top - origin.1),
                x1 - origin.0,
                page.height - (bottom - origin.1),
            );
            if !bbox.is_valid() {
                log::debug!("dropping span group with degenerate box on page {}", page.index);
                continue;
            }

            let fragment =
                Fragment::new(page.index, bbox, text, *next_seq).with_font_size(dominant_size(segment));
            *next_seq += 1;
            fragments.push(fragment);
        }
    }

    fragments
}

/// Graphics and text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    ctm: Matrix,
    text: TextMatrix,
    font: Vec<u8>,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            text: TextMatrix::default(),
            font: Vec::new(),
            font_size: 12.0,
        }
    }
}

impl TextState {
    fn position(&self) -> (f32, f32) {
        self.ctm.apply(self.text.m.e, self.text.m.f)
    }

    fn effective_size(&self) -> f32 {
        self.font_size * self.text.m.vertical_scale() * self.ctm.vertical_scale()
    }
}

/// Affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n = |i: usize| get_number(&operands[i]);
        Some(Matrix {
            a: n(0)?,
            b: n(1)?,
            c: n(2)?,
            d: n(3)?,
            e: n(4)?,
            f: n(5)?,
        })
    }

    /// `self × other`
    fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Text matrix plus the line matrix it restarts from.
#[derive(Debug, Clone)]
struct TextMatrix {
    m: Matrix,
    line: Matrix,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            m: Matrix::IDENTITY,
            line: Matrix::IDENTITY,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, m: Matrix) {
        self.m = m;
        self.line = m;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let offset = Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        };
        self.line = offset.multiply(&self.line);
        self.m = self.line;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

//! Table grid detection from fragment positions (stream mode).
//!
//! Works without ruling lines: fragments are grouped into rows by their top
//! edge, column boundaries are found where left edges line up across rows,
//! and the longest run of well-aligned rows becomes the grid.

use std::collections::{HashMap, HashSet};

use crate::model::Fragment;

/// A row of fragments sharing a baseline band.
#[derive(Debug, Clone)]
struct GridRow<'a> {
    /// Fragments sorted by left edge
    cells: Vec<&'a Fragment>,
}

/// Grid detector configuration.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Minimum number of rows for a table
    pub min_rows: usize,
    /// Minimum number of columns for a table
    pub min_columns: usize,
    /// Above this many columns the split is probably word-level
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of font size
    pub y_tolerance_factor: f32,
    /// Fraction of a row's fragments that must sit on a column edge
    pub min_alignment_ratio: f32,
    /// Minimum distance between column edges (points)
    pub min_column_gap: f32,
    /// Width of the left-edge histogram buckets (points)
    pub bucket_size: f32,
    /// Distance within which a fragment counts as on a column edge
    pub alignment_tolerance: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 12,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            bucket_size: 5.0,
            alignment_tolerance: 5.0,
        }
    }
}

/// Finds a cell grid among the fragments of a table region.
#[derive(Debug, Clone, Default)]
pub struct GridDetector {
    config: GridConfig,
}

impl GridDetector {
    /// Detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with custom configuration.
    pub fn with_config(config: GridConfig) -> Self {
        Self { config }
    }

    /// Detect a grid. Returns rows of cell strings, or `None` when the
    /// fragments do not form at least `min_rows` x `min_columns` cells.
    ///
    /// Cell text is the exact text of the fragments in the cell, joined by
    /// a space.
    pub fn detect(&self, fragments: &[&Fragment]) -> Option<Vec<Vec<String>>> {
        let config = &self.config;
        if fragments.len() < config.min_rows * config.min_columns {
            log::debug!(
                "grid: not enough fragments ({} < {})",
                fragments.len(),
                config.min_rows * config.min_columns
            );
            return None;
        }

        let rows = self.group_into_rows(fragments);
        if rows.len() < config.min_rows {
            log::debug!("grid: not enough rows ({})", rows.len());
            return None;
        }

        let columns = self.detect_columns(&rows);
        if columns.len() < config.min_columns {
            log::debug!("grid: not enough columns ({})", columns.len());
            return None;
        }

        let (start, end) = self.longest_aligned_run(&rows, &columns)?;
        let rows = &rows[start..=end];

        // Column edges of the table body alone
        let columns = self.detect_columns(rows);
        if columns.len() < config.min_columns {
            return None;
        }
        if columns.len() > config.max_columns {
            log::debug!(
                "grid: too many columns ({} > {})",
                columns.len(),
                config.max_columns
            );
            return None;
        }
        if self.is_list_pattern(rows, &columns) {
            log::debug!("grid: rows look like a list");
            return None;
        }

        let cells = self.to_cells(rows, &columns);
        let filled_columns = (0..columns.len())
            .filter(|&c| cells.iter().any(|row| !row[c].is_empty()))
            .count();
        if filled_columns < config.min_columns {
            return None;
        }

        log::debug!("grid: {} rows x {} columns", cells.len(), columns.len());
        Some(cells)
    }

    /// Group fragments into rows by top edge, top to bottom.
    fn group_into_rows<'a>(&self, fragments: &[&'a Fragment]) -> Vec<GridRow<'a>> {
        let mut sorted: Vec<&'a Fragment> = fragments.to_vec();
        sorted.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut rows: Vec<GridRow<'a>> = Vec::new();
        let mut current: Vec<&'a Fragment> = Vec::new();
        let mut current_y: Option<f32> = None;

        for fragment in sorted {
            let size = fragment.font_size.unwrap_or_else(|| fragment.bbox.height());
            let tolerance = size * self.config.y_tolerance_factor;

            match current_y {
                Some(y) if (fragment.bbox.y0 - y).abs() <= tolerance => current.push(fragment),
                _ => {
                    if !current.is_empty() {
                        rows.push(make_row(std::mem::take(&mut current)));
                    }
                    current_y = Some(fragment.bbox.y0);
                    current.push(fragment);
                }
            }
        }
        if !current.is_empty() {
            rows.push(make_row(current));
        }

        rows
    }

    /// Column edges where left edges line up across rows.
    ///
    /// Rows with two or more fragments are the evidence when there are
    /// enough of them; otherwise every fragment votes.
    fn detect_columns(&self, rows: &[GridRow<'_>]) -> Vec<f32> {
        let multi: Vec<&GridRow<'_>> = rows.iter().filter(|r| r.cells.len() >= 2).collect();
        if multi.len() >= self.config.min_rows {
            self.aligned_edges(&multi, true)
        } else {
            let all: Vec<&GridRow<'_>> = rows.iter().collect();
            self.aligned_edges(&all, false)
        }
    }

    fn aligned_edges(&self, rows: &[&GridRow<'_>], once_per_row: bool) -> Vec<f32> {
        let bucket_size = self.config.bucket_size;
        let mut counts: HashMap<i32, usize> = HashMap::new();

        for row in rows {
            let buckets = row.cells.iter().map(|f| (f.bbox.x0 / bucket_size).round() as i32);
            if once_per_row {
                for bucket in buckets.collect::<HashSet<_>>() {
                    *counts.entry(bucket).or_insert(0) += 1;
                }
            } else {
                for bucket in buckets {
                    *counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }

        let min_occurrences =
            ((rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * bucket_size)
            .collect();
        edges.sort_by(f32::total_cmp);

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Longest contiguous run of rows aligned with the columns.
    fn longest_aligned_run(&self, rows: &[GridRow<'_>], columns: &[f32]) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        let mut start: Option<usize> = None;

        let close = |start: usize, end: usize, best: &mut Option<(usize, usize)>| {
            let len = end - start + 1;
            if len >= self.config.min_rows && best.map_or(true, |(s, e)| len > e - s + 1) {
                *best = Some((start, end));
            }
        };

        for (i, row) in rows.iter().enumerate() {
            if self.alignment_score(row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                close(s, i - 1, &mut best);
            }
        }
        if let Some(s) = start {
            close(s, rows.len() - 1, &mut best);
        }

        best
    }

    fn alignment_score(&self, row: &GridRow<'_>, columns: &[f32]) -> f32 {
        if row.cells.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let tolerance = self.config.alignment_tolerance;
        let aligned = row
            .cells
            .iter()
            .filter(|f| columns.iter().any(|c| (f.bbox.x0 - c).abs() <= tolerance))
            .count();
        aligned as f32 / row.cells.len() as f32
    }

    /// Assign every fragment to exactly one column.
    fn to_cells(&self, rows: &[GridRow<'_>], columns: &[f32]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
                for fragment in &row.cells {
                    let column = column_for(fragment.bbox.x0, columns);
                    cells[column].push(fragment.text.trim());
                }
                cells.into_iter().map(|parts| parts.join(" ")).collect()
            })
            .collect()
    }

    /// A numbered or bulleted list split into marker and text fragments
    /// looks like a two-column table.
    fn is_list_pattern(&self, rows: &[GridRow<'_>], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(first) = row.cells.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;

        // Numbered first columns are common in real tables, so only a
        // two-column grid is rejected for them
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }
}

fn make_row(mut cells: Vec<&Fragment>) -> GridRow<'_> {
    cells.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    GridRow { cells }
}

/// Column whose span `[edge - 10, next_edge - 10)` holds `x`, else the nearest edge.
fn column_for(x: f32, columns: &[f32]) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(f32::INFINITY);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
        .map_or(0, |(i, _)| i)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// `1.`, `12)`, a bare number, or a letter marker like `a.`.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let mut chars = cleaned.chars();
    let Some(last) = chars.next_back() else {
        return false;
    };
    if last != '.' && last != ')' {
        return false;
    }
    let body = chars.as_str();
    (!body.is_empty() && body.chars().all(|c| c.is_ascii_digit()))
        || (body.chars().count() == 1 && body.chars().all(char::is_alphabetic))
}

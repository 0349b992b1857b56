//! The forward pass that builds reconciled elements from an alignment plan.

use log::debug;

use super::plan::{Candidate, Planner};
use super::{OrphanGrouping, ReconcileOptions};
use crate::model::{
    BBox, Fragment, InferredRegion, ReconcileStats, ReconciledElement, RegionSource,
    ScaffoldElement,
};

/// Alignment state for one document.
pub(super) struct Session<'a> {
    options: &'a ReconcileOptions,
    fragments: &'a [Fragment],
    cursor: usize,
    elements: Vec<ReconciledElement>,
    /// Most recent text element of any origin
    last_text: Option<usize>,
    /// Most recent matched text element
    last_matched: Option<usize>,
    stats: ReconcileStats,
}

impl<'a> Session<'a> {
    pub(super) fn new(options: &'a ReconcileOptions, fragments: &'a [Fragment]) -> Self {
        Self {
            options,
            fragments,
            cursor: 0,
            elements: Vec::new(),
            last_text: None,
            last_matched: None,
            stats: ReconcileStats::new(),
        }
    }

    /// Align every scaffold element, then adopt the remaining fragments.
    pub(super) fn run(mut self, scaffold: &[ScaffoldElement]) -> (Vec<ReconciledElement>, ReconcileStats) {
        let plan = Planner::new(self.options, self.fragments).plan(scaffold);
        for (element, run) in scaffold.iter().zip(plan) {
            self.stats.scaffold_elements += 1;
            if !element.kind.is_text() {
                self.push_placeholder(element);
                continue;
            }
            match run {
                Some(run) => self.accept(element, run),
                None => {
                    debug!(
                        "discarding {} {} (no run at {:.3}): {:?}",
                        element.kind,
                        element.seq,
                        self.options.similarity_threshold,
                        truncate(&element.text, 60)
                    );
                    self.stats.discarded += 1;
                }
            }
        }
        self.adopt_orphans(self.fragments.len());
        (self.elements, self.stats)
    }

    fn push_placeholder(&mut self, element: &ScaffoldElement) {
        // The real region is set once both neighbouring anchors are known
        let pending = InferredRegion::new(0, BBox::new(0.0, 0.0, 0.0, 0.0), RegionSource::PageFallback);
        let mut placeholder = ReconciledElement::placeholder(element.kind, pending, element.seq);
        placeholder.level = element.level;
        self.elements.push(placeholder);
        self.stats.non_text += 1;

        // Orphans after a placeholder must not jump back over it
        self.last_text = None;
        self.last_matched = None;
    }

    fn accept(&mut self, element: &ScaffoldElement, run: Candidate) {
        self.adopt_orphans(run.start);

        let fragments = self.fragments[run.start..=run.end].to_vec();
        let mut matched =
            ReconciledElement::matched(element.kind, fragments, run.score, element.seq);
        matched.level = element.level;
        debug!(
            "matched {} {} to fragments {}..={} (score {:.3})",
            element.kind, element.seq, run.start, run.end, run.score
        );

        self.elements.push(matched);
        let index = self.elements.len() - 1;
        self.last_text = Some(index);
        self.last_matched = Some(index);
        self.cursor = run.end + 1;
        self.stats.accepted += 1;
    }

    /// Adopt every fragment from the cursor up to `until` as an orphan.
    fn adopt_orphans(&mut self, until: usize) {
        while self.cursor < until {
            self.adopt_orphan(self.cursor);
            self.cursor += 1;
        }
    }

    fn adopt_orphan(&mut self, index: usize) {
        let fragment = &self.fragments[index];
        let target = match self.options.orphan_grouping {
            OrphanGrouping::PerPage => self.last_text,
            OrphanGrouping::PerFragment => self.last_matched,
        };
        let across = self.options.attach_orphans_across_pages;
        let host = target.filter(|&i| across || self.elements[i].last_page() == Some(fragment.page));

        match host {
            Some(i) => {
                self.elements[i].adopt(fragment.clone());
                self.stats.orphans_appended += 1;
            }
            None => {
                self.elements.push(ReconciledElement::orphan(vec![fragment.clone()]));
                self.last_text = Some(self.elements.len() - 1);
                self.stats.orphan_paragraphs += 1;
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}

//! Choosing which fragment run, if any, each scaffold element takes.
//!
//! Runs are consumed left to right, and every text element either takes one
//! run scoring at least the threshold or is discarded. The plan accepts as
//! many elements as any such assignment can, so raising the threshold never
//! increases the accepted count. Among maximal plans, each element takes its
//! preferred run (highest score, then fewest fragments, then earliest start)
//! whenever that still leads to a maximal total. On inputs where taking the
//! preferred run never costs a later match, this is the plain forward pass.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::similarity::{normalize, Scorer};
use super::{Lookahead, ReconcileOptions};
use crate::model::{Fragment, ScaffoldElement};

/// A fragment run supporting one scaffold element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Candidate {
    pub(super) start: usize,
    pub(super) end: usize,
    pub(super) score: f32,
}

impl Candidate {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Cursor after consuming the run.
    fn next(&self) -> usize {
        self.end + 1
    }
}

/// Preferred runs sort first.
fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.len().cmp(&b.len()))
        .then(a.start.cmp(&b.start))
}

struct Target {
    text: String,
    max_units: usize,
}

/// Supported runs by start fragment, for one scaffold element.
type RunCache = HashMap<usize, Vec<Candidate>>;

/// Alignment planner over one document's fragments.
pub(super) struct Planner<'a> {
    options: &'a ReconcileOptions,
    scorer: Scorer,
    fragments: &'a [Fragment],
    normalized: Vec<String>,
    units: Vec<usize>,
}

impl<'a> Planner<'a> {
    pub(super) fn new(options: &'a ReconcileOptions, fragments: &'a [Fragment]) -> Self {
        let scorer = Scorer::new(options.metric);
        let normalized: Vec<String> = fragments.iter().map(|f| normalize(&f.text)).collect();
        let units = normalized.iter().map(|n| scorer.units(n)).collect();
        Self {
            options,
            scorer,
            fragments,
            normalized,
            units,
        }
    }

    /// One entry per scaffold element: the run it takes, or `None` when it
    /// is discarded or is not a text element.
    pub(super) fn plan(&self, scaffold: &[ScaffoldElement]) -> Vec<Option<Candidate>> {
        let targets: Vec<Option<Target>> = scaffold.iter().map(|e| self.target(e)).collect();
        let n = targets.len();
        let mut caches: Vec<RunCache> = vec![RunCache::new(); n];

        // Any feasible plan bounds the optimum from below
        let greedy = self.greedy(&targets, &mut caches);
        let floor = greedy.iter().flatten().count();

        let mut remaining = vec![0; n + 1];
        for i in (0..n).rev() {
            remaining[i] = remaining[i + 1] + usize::from(targets[i].is_some());
        }

        // Forward: reachable cursors per step, with the most acceptances
        // reaching each. States that cannot reach the floor are dropped.
        let mut layers: Vec<BTreeMap<usize, usize>> = Vec::with_capacity(n + 1);
        layers.push(BTreeMap::from([(0, 0)]));
        let mut choices: Vec<HashMap<usize, Vec<Candidate>>> = Vec::with_capacity(n);
        for (i, target) in targets.iter().enumerate() {
            let mut next = BTreeMap::new();
            let mut here = HashMap::new();
            for (&cursor, &accepted) in &layers[i] {
                reach(&mut next, cursor, accepted);
                if let Some(target) = target {
                    let options = self.options_from(target, &mut caches[i], cursor);
                    for run in &options {
                        reach(&mut next, run.next(), accepted + 1);
                    }
                    here.insert(cursor, options);
                }
            }
            next.retain(|_, accepted| *accepted + remaining[i + 1] >= floor);
            layers.push(next);
            choices.push(here);
        }

        // Backward: most acceptances still possible from each state
        let mut future: Vec<HashMap<usize, usize>> = vec![HashMap::new(); n + 1];
        future[n] = layers[n].keys().map(|&cursor| (cursor, 0)).collect();
        for i in (0..n).rev() {
            let mut values = HashMap::new();
            for &cursor in layers[i].keys() {
                let mut best = future[i + 1].get(&cursor).copied();
                for run in choices[i].get(&cursor).into_iter().flatten() {
                    if let Some(&after) = future[i + 1].get(&run.next()) {
                        best = Some(best.map_or(after + 1, |b| b.max(after + 1)));
                    }
                }
                if let Some(best) = best {
                    values.insert(cursor, best);
                }
            }
            future[i] = values;
        }

        let Some(&total) = future[0].get(&0) else {
            return greedy;
        };
        if total > floor {
            debug!("alignment plan accepts {} elements, forward pass {}", total, floor);
        }

        let mut plan = Vec::with_capacity(n);
        let mut cursor = 0;
        let mut wanted = total;
        for i in 0..n {
            let options = choices[i].get(&cursor);
            let chosen = options.and_then(|options| {
                options
                    .iter()
                    .copied()
                    .find(|run| wanted > 0 && future[i + 1].get(&run.next()) == Some(&(wanted - 1)))
            });
            match chosen {
                Some(run) => {
                    cursor = run.next();
                    wanted -= 1;
                }
                None if options.map_or(false, |o| !o.is_empty()) => {
                    debug!("element {} gives up a supported run to keep later matches", i);
                }
                None => {}
            }
            plan.push(chosen);
        }
        plan
    }

    fn target(&self, element: &ScaffoldElement) -> Option<Target> {
        if !element.kind.is_text() {
            return None;
        }
        let text = normalize(&element.text);
        if text.is_empty() {
            return None;
        }
        let max_units = self
            .scorer
            .max_candidate_units(self.scorer.units(&text), self.options.similarity_threshold);
        Some(Target { text, max_units })
    }

    /// Each element takes its preferred run from the running cursor.
    fn greedy(&self, targets: &[Option<Target>], caches: &mut [RunCache]) -> Vec<Option<Candidate>> {
        let mut cursor = 0;
        targets
            .iter()
            .zip(caches.iter_mut())
            .map(|(target, cache)| {
                let run = target
                    .as_ref()
                    .and_then(|t| self.options_from(t, cache, cursor).first().copied());
                if let Some(run) = run {
                    cursor = run.next();
                }
                run
            })
            .collect()
    }

    /// Supported runs inside the window at `cursor`, preferred first.
    fn options_from(&self, target: &Target, cache: &mut RunCache, cursor: usize) -> Vec<Candidate> {
        let end = self.window_end(cursor);
        let mut options = Vec::new();
        for start in cursor..end {
            let runs = cache
                .entry(start)
                .or_insert_with(|| self.runs_from(target, start));
            options.extend(runs.iter().filter(|run| run.end < end).copied());
        }
        options.sort_by(preference);
        options
    }

    /// Every run starting at `start` that scores at least the threshold.
    fn runs_from(&self, target: &Target, start: usize) -> Vec<Candidate> {
        let limit = self
            .fragments
            .len()
            .min(start.saturating_add(self.options.max_run_fragments));
        let separator = self.scorer.separator_units();
        let threshold = self.options.similarity_threshold;
        let mut text = String::new();
        let mut units = 0;
        let mut runs = Vec::new();

        for end in start..limit {
            let piece = &self.normalized[end];
            if !text.is_empty() && !piece.is_empty() {
                text.push(' ');
                units += separator;
            }
            text.push_str(piece);
            units += self.units[end];
            if units > target.max_units {
                break;
            }
            let score = self.scorer.score(&target.text, &text);
            if score >= threshold {
                runs.push(Candidate { start, end, score });
            }
        }
        runs
    }

    /// Exclusive end of the search window for a cursor.
    fn window_end(&self, cursor: usize) -> usize {
        let len = self.fragments.len();
        if cursor >= len {
            return len;
        }
        match self.options.lookahead {
            Lookahead::Pages(n) => {
                let last_page = self.fragments[cursor].page.saturating_add(n);
                self.fragments[cursor..]
                    .iter()
                    .position(|f| f.page > last_page)
                    .map_or(len, |offset| cursor + offset)
            }
            Lookahead::Fragments(n) => cursor.saturating_add(n).min(len),
            Lookahead::RestOfDocument => len,
        }
    }
}

fn reach(layer: &mut BTreeMap<usize, usize>, cursor: usize, accepted: usize) {
    let slot = layer.entry(cursor).or_insert(accepted);
    *slot = (*slot).max(accepted);
}

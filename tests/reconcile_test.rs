//! Integration tests for reconciliation of a scaffold against extracted text.

use supergrobid::model::{Origin, RegionSource};
use supergrobid::reconcile::SimilarityMetric;
use supergrobid::services::parse_markdown_scaffold;
use supergrobid::{
    BBox, ElementKind, Fragment, Lookahead, OrphanGrouping, PageGeometry, ReconcileInput,
    ReconcileOptions, Reconciler, Region, RegionLabel, ScaffoldElement,
};

fn line(page: u32, row: usize, text: &str, seq: usize) -> Fragment {
    let y = 72.0 + row as f32 * 16.0;
    Fragment::new(page, BBox::new(72.0, y, 540.0, y + 11.0), text, seq)
}

fn pages(n: u32) -> Vec<PageGeometry> {
    (0..n).map(PageGeometry::letter).collect()
}

fn all_text(elements: &[supergrobid::ReconciledElement]) -> Vec<usize> {
    elements
        .iter()
        .flat_map(|e| e.fragments.iter().map(|f| f.seq))
        .collect()
}

#[test]
fn test_every_fragment_appears_exactly_once() {
    let fragments = vec![
        line(0, 0, "Abstract", 0),
        line(0, 1, "We propose a hybrid parser.", 1),
        line(0, 2, "Running header 2024", 2),
        line(0, 3, "Experiments", 3),
        line(0, 4, "We evaluate on two corpora.", 4),
        line(1, 0, "Footnote text", 5),
    ];
    let scaffold = parse_markdown_scaffold(
        "## Abstract\n\nWe propose a hybrid parser.\n\n## Experiments\n\nWe evaluate on two corpora.\n",
    );

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(2), &fragments, &scaffold))
        .unwrap();

    assert_eq!(all_text(&result.elements), vec![0, 1, 2, 3, 4, 5]);
    assert!(result.elements.iter().all(|e| e.is_traceable()));
    assert_eq!(result.stats.accepted, 4);
    assert_eq!(result.stats.orphans_appended, 1);
    assert_eq!(result.stats.orphan_paragraphs, 1);
    assert_eq!(result.elements.last().map(|e| e.origin), Some(Origin::Orphan));
}

#[test]
fn test_paraphrase_accepted_with_lower_confidence() {
    let fragments = vec![line(0, 0, "The model is trained with stochastic gradient descent.", 0)];
    let scaffold = vec![ScaffoldElement::paragraph(
        "The model is trained using stochastic gradient descent.",
        0,
    )];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold))
        .unwrap();
    let element = &result.elements[0];
    assert_eq!(element.origin, Origin::Matched);
    assert!(element.confidence < 1.0);
    assert!(element.confidence >= 0.8);
    // Text comes from the fragments, not the scaffold
    assert_eq!(
        element.text.as_deref(),
        Some("The model is trained with stochastic gradient descent.")
    );
}

#[test]
fn test_threshold_controls_acceptance() {
    let fragments = vec![line(0, 0, "Results on the held-out split improve steadily.", 0)];
    let scaffold = vec![ScaffoldElement::paragraph("Held-out results improve.", 0)];
    let page_list = pages(1);
    let input = ReconcileInput::new(&page_list, &fragments, &scaffold);

    let strict = Reconciler::new(ReconcileOptions::new().with_threshold(0.95))
        .reconcile(&input)
        .unwrap();
    assert_eq!(strict.stats.discarded, 1);
    assert_eq!(strict.elements[0].origin, Origin::Orphan);

    let loose = Reconciler::new(ReconcileOptions::new().with_threshold(0.05))
        .reconcile(&input)
        .unwrap();
    assert_eq!(loose.stats.accepted, 1);
}

#[test]
fn test_hallucinations_never_reach_output() {
    let fragments = vec![line(0, 0, "Introduction", 0), line(0, 1, "Plain body text.", 1)];
    let scaffold = vec![
        ScaffoldElement::heading("Introduction", 1, 0),
        ScaffoldElement::paragraph("An invented sentence about astrophysics and quasars.", 1),
        ScaffoldElement::paragraph("Plain body text.", 2),
    ];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold))
        .unwrap();
    assert_eq!(result.stats.discarded, 1);
    assert_eq!(result.stats.scaffold_elements, 3);
    assert!(result
        .elements
        .iter()
        .filter_map(|e| e.text.as_deref())
        .all(|t| !t.contains("quasars")));
}

#[test]
fn test_placeholder_region_between_anchors() {
    let fragments = vec![
        line(0, 0, "Before the equation.", 0),
        line(0, 10, "After the equation.", 1),
    ];
    let scaffold = vec![
        ScaffoldElement::paragraph("Before the equation.", 0),
        ScaffoldElement::new(ElementKind::Equation, "E = mc^2", 1),
        ScaffoldElement::paragraph("After the equation.", 2),
    ];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold))
        .unwrap();
    let equation = &result.elements[1];
    assert_eq!(equation.kind, ElementKind::Equation);
    assert!(equation.text.is_none());
    let region = equation.region.unwrap();
    assert_eq!(region.source, RegionSource::Interpolated);
    assert_eq!(region.page, 0);
    assert_eq!(region.bbox.y0, fragments[0].bbox.y1);
    assert_eq!(region.bbox.y1, fragments[1].bbox.y0);
}

#[test]
fn test_detected_region_refines_placeholder() {
    let fragments = vec![
        line(0, 0, "Before the table.", 0),
        line(0, 12, "After the table.", 1),
    ];
    let scaffold = vec![
        ScaffoldElement::paragraph("Before the table.", 0),
        ScaffoldElement::placeholder(ElementKind::Table, 1),
        ScaffoldElement::paragraph("After the table.", 2),
    ];
    let detected = BBox::new(90.0, 120.0, 520.0, 240.0);
    let regions = vec![Region::new(0, detected, RegionLabel::Table, 0.9)];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold).with_regions(&regions))
        .unwrap();
    let region = result.elements[1].region.unwrap();
    assert_eq!(region.source, RegionSource::Detected);
    assert_eq!(region.bbox, detected);
}

#[test]
fn test_placeholder_without_anchors_uses_page() {
    let scaffold = vec![ScaffoldElement::placeholder(ElementKind::Figure, 0)];
    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &[], &scaffold))
        .unwrap();
    let region = result.elements[0].region.unwrap();
    assert_eq!(region.source, RegionSource::PageFallback);
    assert_eq!(region.bbox, PageGeometry::letter(0).bbox());
}

#[test]
fn test_options_change_grouping_and_window() {
    let fragments = vec![
        line(0, 0, "alpha", 0),
        line(0, 1, "beta", 1),
        line(1, 0, "gamma", 2),
        line(2, 0, "delta", 3),
        line(3, 0, "A sentence far ahead in the document.", 4),
    ];
    let scaffold = vec![ScaffoldElement::paragraph("A sentence far ahead in the document.", 0)];
    let page_list = pages(4);
    let input = ReconcileInput::new(&page_list, &fragments, &scaffold);

    let narrow = Reconciler::default().reconcile(&input).unwrap();
    assert_eq!(narrow.stats.accepted, 0);

    let options = ReconcileOptions::new()
        .with_lookahead(Lookahead::RestOfDocument)
        .with_orphan_grouping(OrphanGrouping::PerFragment)
        .with_metric(SimilarityMetric::default());
    let wide = Reconciler::new(options).reconcile(&input).unwrap();
    assert_eq!(wide.stats.accepted, 1);
    assert_eq!(wide.stats.orphan_paragraphs, 4);
    assert_eq!(all_text(&wide.elements), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_reference_section_merged() {
    let fragments = vec![
        line(0, 0, "References", 0),
        line(0, 1, "[1] A. Author. Paper one. 2019.", 1),
        line(0, 2, "[2] B. Author. Paper two. 2020.", 2),
    ];
    let scaffold = parse_markdown_scaffold(
        "# References\n\n[1] A. Author. Paper one. 2019.\n\n[2] B. Author. Paper two. 2020.\n",
    );

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold))
        .unwrap();
    let kinds: Vec<ElementKind> = result.elements.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ElementKind::Heading, ElementKind::ReferenceList]);
    assert_eq!(result.elements[1].fragments.len(), 2);
    assert_eq!(result.stats.reference_blocks, 1);
}

#[test]
fn test_threshold_monotonic_and_deterministic() {
    let fragments = vec![
        line(0, 0, "Deep networks learn hierarchical features", 0),
        line(0, 1, "from raw pixels without supervision.", 1),
        line(0, 2, "We report accuracy on three benchmarks.", 2),
        line(0, 3, "Limitations are discussed at the end.", 3),
    ];
    let scaffold = vec![
        ScaffoldElement::paragraph(
            "Deep networks learn hierarchical features from pixels without supervision.",
            0,
        ),
        ScaffoldElement::paragraph("We report the accuracy on 3 benchmarks.", 1),
        ScaffoldElement::paragraph("Limitations are discussed at the end.", 2),
    ];
    let page_list = pages(1);
    let input = ReconcileInput::new(&page_list, &fragments, &scaffold);

    let mut previous = usize::MAX;
    for threshold in [0.5, 0.7, 0.8, 0.9, 0.95, 1.0] {
        let reconciler = Reconciler::new(ReconcileOptions::new().with_threshold(threshold));
        let first = reconciler.reconcile(&input).unwrap();
        let second = reconciler.reconcile(&input).unwrap();
        assert_eq!(first.elements, second.elements);
        assert!(first.stats.accepted <= previous, "threshold {}", threshold);
        assert_eq!(all_text(&first.elements), vec![0, 1, 2, 3]);
        previous = first.stats.accepted;
    }
}

#[test]
fn test_low_threshold_paraphrase_does_not_swallow_later_matches() {
    let fragments = vec![
        line(0, 0, "Alpha bravo charlie delta.", 0),
        line(0, 1, "Echo foxtrot golf hotel.", 1),
        line(0, 2, "one two three four five six", 2),
    ];
    let scaffold = vec![
        ScaffoldElement::paragraph("one two three four ninety eleven", 0),
        ScaffoldElement::paragraph("Alpha bravo charlie delta.", 1),
        ScaffoldElement::paragraph("Echo foxtrot golf hotel.", 2),
    ];
    let page_list = pages(1);
    let input = ReconcileInput::new(&page_list, &fragments, &scaffold);

    let mut counts = Vec::new();
    for threshold in [0.6, 0.7, 0.8, 0.9] {
        let result = Reconciler::new(ReconcileOptions::new().with_threshold(threshold))
            .reconcile(&input)
            .unwrap();
        assert_eq!(all_text(&result.elements), vec![0, 1, 2]);
        counts.push(result.stats.accepted);
    }
    assert!(counts.windows(2).all(|w| w[0] >= w[1]), "counts {:?}", counts);

    let loose = Reconciler::new(ReconcileOptions::new().with_threshold(0.6))
        .reconcile(&input)
        .unwrap();
    assert_eq!(loose.stats.accepted, 2);
    assert_eq!(loose.elements[0].scaffold_seq, Some(1));
    assert_eq!(loose.elements[1].scaffold_seq, Some(2));
}

#[test]
fn test_exact_text_takes_exactly_its_three_fragments() {
    let fragments = vec![
        line(0, 0, "The proposed method", 0),
        line(0, 1, "outperforms every baseline", 1),
        line(0, 2, "on all four datasets.", 2),
        line(0, 3, "Section five concludes.", 3),
    ];
    let scaffold = vec![
        ScaffoldElement::paragraph(
            "The proposed method outperforms every baseline on all four datasets.",
            0,
        ),
        ScaffoldElement::paragraph("Section five concludes.", 1),
    ];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold))
        .unwrap();
    let first = &result.elements[0];
    let seqs: Vec<usize> = first.fragments.iter().map(|f| f.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(first.confidence, 1.0);
    assert_eq!(
        first.text.as_deref(),
        Some("The proposed method outperforms every baseline on all four datasets.")
    );
    // The next element starts right after the three consumed fragments
    assert_eq!(result.elements[1].fragments[0].seq, 3);
    assert_eq!(result.stats.orphans_appended, 0);
}

#[test]
fn test_invented_heading_leaves_cursor_in_place() {
    let fragments = vec![
        line(0, 0, "Results", 0),
        line(0, 1, "Accuracy improves with depth.", 1),
    ];
    let scaffold = vec![
        ScaffoldElement::heading("Conclusions and Future Directions", 1, 0),
        ScaffoldElement::heading("Results", 1, 1),
        ScaffoldElement::paragraph("Accuracy improves with depth.", 2),
    ];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(1), &fragments, &scaffold))
        .unwrap();
    assert_eq!(result.stats.discarded, 1);
    assert_eq!(result.stats.accepted, 2);
    assert!(result
        .elements
        .iter()
        .all(|e| e.scaffold_seq != Some(0)));
    assert_eq!(result.elements[0].scaffold_seq, Some(1));
    assert_eq!(result.elements[0].fragments[0].seq, 0);
    assert_eq!(all_text(&result.elements), vec![0, 1]);
}

#[test]
fn test_table_between_paragraphs_on_third_page() {
    let fragments = vec![
        Fragment::new(2, BBox::new(72.0, 380.0, 540.0, 400.0), "Paragraph above the table.", 0),
        Fragment::new(2, BBox::new(72.0, 600.0, 540.0, 612.0), "Paragraph below the table.", 1),
    ];
    let scaffold = vec![
        ScaffoldElement::paragraph("Paragraph above the table.", 0),
        ScaffoldElement::placeholder(ElementKind::Table, 1),
        ScaffoldElement::paragraph("Paragraph below the table.", 2),
    ];

    let result = Reconciler::default()
        .reconcile(&ReconcileInput::new(&pages(3), &fragments, &scaffold))
        .unwrap();
    let region = result.elements[1].region.unwrap();
    assert_eq!(region.page, 2);
    assert_eq!(region.bbox, BBox::new(0.0, 400.0, 612.0, 600.0));
}

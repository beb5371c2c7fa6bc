//! End-to-end tests: ingest, locate, select, match, group and render.

use evidence_lens::geometry::{CoordinateSpace, RawBox, Rect};
use evidence_lens::grouping::QualityTier;
use evidence_lens::locator::SentenceLocator;
use evidence_lens::matcher::{Consumption, ConsumptionMap};
use evidence_lens::model::{
    DocumentId, EvidenceSet, FragmentId, MatchType, PageNumber, RawFragment, SentenceCorpus,
    TextFragment,
};
use evidence_lens::pipeline::{
    DocumentState, EmptyReason, EngineConfig, HighlightSession, MatchProfile, SelectionOutcome,
    SessionState,
};
use evidence_lens::render::{HighlightRenderer, MemoryLayer, Overlay};
use evidence_lens::source::{InMemorySource, WordConsumptionSource};

// ============================================================================
// Fixtures
// ============================================================================

fn line(text: &str, page: PageNumber, x: f32, y: f32, width: f32, order: usize) -> TextFragment {
    TextFragment::new(text, page, Rect::new(x, y, width, 12.0), order)
}

/// The model-accuracy scenario: sentence 0 appears verbatim on page 3 only.
fn scenario() -> DocumentState {
    let corpus = SentenceCorpus::from_texts([
        "The model achieves 92% accuracy.",
        "Prior work used smaller datasets.",
    ]);
    DocumentState::empty()
        .load_document(DocumentId::new("paper"), corpus)
        .with_pages(
            vec![
                (1, vec![line("Abstract", 1, 72.0, 72.0, 60.0, 0)]),
                (2, vec![line("Methods are described below.", 2, 72.0, 72.0, 200.0, 0)]),
                (
                    3,
                    vec![
                        line("The model achieves", 3, 72.0, 100.0, 110.0, 0),
                        line("92% accuracy.", 3, 72.0, 114.0, 80.0, 1),
                        line("Table 2 lists the baselines.", 3, 72.0, 400.0, 180.0, 2),
                    ],
                ),
            ],
            1.0,
        )
        .relocate(&SentenceLocator::default())
}

fn snapshot(layer: &MemoryLayer) -> Vec<(Rect, QualityTier)> {
    layer.overlays().map(|o| (o.rect, o.tier)).collect()
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_scenario_mappings() {
    let state = scenario();
    let mappings = state.mappings();

    assert_eq!(mappings[0].page, 3);
    assert!(mappings[0].confidence > 0.8);
    assert_eq!(mappings[0].match_type, MatchType::Exact);
    assert!(mappings[1].page >= 3);
}

#[test]
fn test_scenario_renders_one_high_tier_group() {
    let state = scenario();
    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();

    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    assert_eq!(ticket.page, Some(3));

    let outcome = session.complete(&ticket, &state, None, &mut layer);
    assert!(matches!(&outcome, SelectionOutcome::Rendered(h) if h.len() == 1));

    let overlays: Vec<&Overlay> = layer.overlays().collect();
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].tier, QualityTier::High);
    assert_eq!(overlays[0].key.sentence_id, 0);
    // Encloses both lines of the sentence and nothing else
    assert_eq!(overlays[0].rect, Rect::new(72.0, 100.0, 110.0, 26.0));
    assert_eq!(overlays[0].class_name, "evidence-highlight-high");
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_repeated_completion_is_idempotent() {
    let state = scenario();
    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();

    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    session.complete(&ticket, &state, None, &mut layer);
    let first = snapshot(&layer);
    session.complete(&ticket, &state, None, &mut layer);
    let second = snapshot(&layer);

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[test]
fn test_renderer_idempotent_for_identical_groups() {
    let state = scenario();
    let fragments = &state.pages().get_page(3).unwrap().fragments;
    let result = evidence_lens::matcher::FragmentMatcher::default().match_sentence_on_page(
        "The model achieves 92% accuracy.",
        fragments,
        None,
    );
    let groups = evidence_lens::grouping::SpatialGrouper::default().group(0, &result.elements);

    let mut renderer = HighlightRenderer::default();
    let mut layer = MemoryLayer::new();
    renderer.render(&groups, &mut layer);
    let first = snapshot(&layer);
    renderer.render(&groups, &mut layer);

    assert_eq!(first, snapshot(&layer));
    assert_eq!(renderer.len(), layer.len());
}

// ============================================================================
// Selection Lifecycle
// ============================================================================

#[test]
fn test_superseded_selection_is_discarded() {
    let state = scenario();
    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();

    let old = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    session.selection_cleared(&mut layer);

    assert_eq!(session.complete(&old, &state, None, &mut layer), SelectionOutcome::Stale);
    assert!(layer.is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_zoom_clears_overlays_and_requires_recapture() {
    let state = scenario();
    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();

    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    session.complete(&ticket, &state, None, &mut layer);
    assert_eq!(layer.len(), 1);

    session.scale_changed(2.0, &mut layer);
    assert!(layer.is_empty());

    // The page is still cached at scale 1.0
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    assert_eq!(
        session.complete(&ticket, &state, None, &mut layer),
        SelectionOutcome::Empty(EmptyReason::ScaleMismatch)
    );

    // Re-capturing the page at the new scale makes it usable again
    let rescaled: Vec<TextFragment> = state
        .pages()
        .get_page(3)
        .unwrap()
        .fragments
        .iter()
        .map(|f| TextFragment::new(f.text.clone(), 3, f.bbox.scaled(2.0), f.reading_order))
        .collect();
    let state = state
        .with_page(3, rescaled, 2.0)
        .relocate(&SentenceLocator::default());
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    assert!(matches!(
        session.complete(&ticket, &state, None, &mut layer),
        SelectionOutcome::Rendered(_)
    ));
    assert_eq!(snapshot(&layer)[0].0, Rect::new(144.0, 200.0, 220.0, 52.0));
}

#[test]
fn test_upstream_consumption_is_used() {
    let state = scenario();
    let mut map = ConsumptionMap::new();
    map.insert(FragmentId::new(3, 0), Consumption::new(0.9, Vec::new()));
    map.insert(FragmentId::new(3, 1), Consumption::new(0.9, Vec::new()));
    let source = InMemorySource::new().with_consumption(0, map);

    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    let outcome = session.complete(
        &ticket,
        &state,
        Some(&source as &dyn WordConsumptionSource),
        &mut layer,
    );

    assert!(matches!(outcome, SelectionOutcome::Rendered(_)));
    let overlay = layer.overlays().next().unwrap();
    assert_eq!(overlay.tier, QualityTier::High);
}

#[test]
fn test_consumption_keys_use_renumbered_reading_order() {
    // The renderer reported sparse, unsorted indices 9 and 4
    let state = DocumentState::empty()
        .load_document(
            DocumentId::new("paper"),
            SentenceCorpus::from_texts(["The model achieves 92% accuracy."]),
        )
        .with_page(
            3,
            vec![
                line("92% accuracy.", 3, 72.0, 114.0, 80.0, 9),
                line("The model achieves", 3, 72.0, 100.0, 110.0, 4),
            ],
            1.0,
        )
        .relocate(&SentenceLocator::default());

    let orders: Vec<usize> = state
        .pages()
        .get_page(3)
        .unwrap()
        .fragments
        .iter()
        .map(|f| f.reading_order)
        .collect();
    assert_eq!(orders, vec![0, 1]);

    let mut map = ConsumptionMap::new();
    map.insert(FragmentId::new(3, 0), Consumption::new(0.9, Vec::new()));
    map.insert(FragmentId::new(3, 1), Consumption::new(0.9, Vec::new()));
    let source = InMemorySource::new().with_consumption(0, map);

    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    let outcome = session.complete(
        &ticket,
        &state,
        Some(&source as &dyn WordConsumptionSource),
        &mut layer,
    );

    assert!(matches!(outcome, SelectionOutcome::Rendered(_)));
    let overlay = layer.overlays().next().unwrap();
    assert_eq!(overlay.tier, QualityTier::High);
    assert_eq!(overlay.rect, Rect::new(72.0, 100.0, 110.0, 26.0));
}

// ============================================================================
// Ingestion and Degradation
// ============================================================================

#[test]
fn test_pdf_space_fragments_are_normalized_once() {
    let raw = vec![
        RawFragment {
            text: "The committee approved".to_string(),
            page: 1,
            bbox: RawBox::Xywh {
                x: 72.0,
                y: 680.0,
                width: 130.0,
                height: 12.0,
            },
            reading_order: Some(0),
        },
        RawFragment {
            text: "the annual budget.".to_string(),
            page: 1,
            bbox: RawBox::Corners {
                x0: 180.0,
                y0: 666.0,
                x1: 72.0,
                y1: 654.0,
            },
            reading_order: Some(1),
        },
        RawFragment {
            text: "broken".to_string(),
            page: 1,
            bbox: RawBox::Xywh {
                x: f32::NAN,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            reading_order: Some(2),
        },
    ];
    let source = InMemorySource::new()
        .with_document(
            DocumentId::new("minutes"),
            vec!["The committee approved the annual budget.".to_string()],
        )
        .with_page(1, raw);

    let state = DocumentState::empty()
        .load_from(&source, DocumentId::new("minutes"))
        .ingest_from(&source, &[1], &CoordinateSpace::pdf(792.0))
        .relocate(&SentenceLocator::default());

    let page = state.pages().get_page(1).unwrap();
    assert_eq!(page.fragments.len(), 2);
    assert_eq!(page.fragments[0].bbox, Rect::new(72.0, 100.0, 130.0, 12.0));
    assert_eq!(page.fragments[1].bbox, Rect::new(72.0, 126.0, 108.0, 12.0));
    assert_eq!(state.mappings()[0].match_type, MatchType::Exact);

    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    assert!(matches!(
        session.complete(&ticket, &state, None, &mut layer),
        SelectionOutcome::Rendered(_)
    ));
}

#[test]
fn test_missing_inputs_never_fail() {
    let mut session = HighlightSession::default();
    let mut layer = MemoryLayer::new();

    // No document at all
    let empty = DocumentState::empty().relocate(&SentenceLocator::default());
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0, 1]), &empty, &mut layer);
    assert_eq!(
        session.complete(&ticket, &empty, None, &mut layer),
        SelectionOutcome::Empty(EmptyReason::NoEvidence)
    );

    // Sentence service failure degrades to an empty corpus
    let failed = DocumentState::empty()
        .load_from(&InMemorySource::new(), DocumentId::new("missing"))
        .relocate(&SentenceLocator::default());
    assert!(failed.corpus().is_empty());
    assert_eq!(failed.statistics().total_sentences, 0);

    // Sentence located but nothing on the page matches
    let state = DocumentState::empty()
        .load_document(
            DocumentId::new("doc"),
            SentenceCorpus::from_texts(["Quantum entanglement experiments."]),
        )
        .with_page(1, vec![line("Completely different words", 1, 0.0, 0.0, 200.0, 0)], 1.0)
        .relocate(&SentenceLocator::default());
    let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
    assert_eq!(
        session.complete(&ticket, &state, None, &mut layer),
        SelectionOutcome::Empty(EmptyReason::NoMatch)
    );
    assert!(layer.is_empty());
}

#[test]
fn test_profiles_produce_valid_configs() {
    for profile in [MatchProfile::Default, MatchProfile::MultiColumn, MatchProfile::Scanned] {
        let config = profile.create_config();
        assert!(config.validate().is_ok());
        let session = HighlightSession::new(&config);
        assert_eq!(session.state(), SessionState::Idle);
    }
    assert_ne!(
        MatchProfile::MultiColumn.create_config().grouping,
        EngineConfig::default().grouping
    );
}

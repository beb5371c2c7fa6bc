//! Highlight session: the selection state machine.
//!
//! ```text
//! Idle --begin_selection--> Locating --complete--> Matching -> Grouping -> Rendered
//!   ^                                                                        |
//!   +---------- page_changed / scale_changed / selection_cleared ------------+
//! ```
//!
//! Each selection gets a token. Between [`HighlightSession::begin_selection`]
//! and [`HighlightSession::complete`] the host navigates to the target page
//! and waits for the settle delay; any navigation, zoom or new selection in
//! the meantime bumps the token, and the late completion is discarded as
//! [`SelectionOutcome::Stale`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grouping::{Group, SpatialGrouper};
use crate::matcher::{ConsumptionMap, FragmentMatcher};
use crate::model::{EvidenceSet, FragmentId, PageNumber, SentenceId};
use crate::pipeline::config::EngineConfig;
use crate::pipeline::state::DocumentState;
use crate::render::{HighlightLayer, HighlightRenderer, OverlayHandle};
use crate::source::WordConsumptionSource;

/// Scales closer than this are considered equal.
const SCALE_EPSILON: f32 = 1e-3;

/// Where the session is in the selection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing selected
    Idle,
    /// Selection started; waiting for the target page to settle
    Locating,
    /// Matching evidence sentences against page fragments
    Matching,
    /// Grouping matched fragments
    Grouping,
    /// Overlays are on the page
    Rendered,
}

/// Identity of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionToken(pub u64);

/// Handed out by `begin_selection`, redeemed by `complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTicket {
    /// Token current when the selection started
    pub token: SelectionToken,
    /// Evidence sentences of the selection
    pub sentence_ids: Vec<SentenceId>,
    /// Page to navigate to, if any evidence sentence is mapped
    pub page: Option<PageNumber>,
}

/// Why a selection produced no overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The evidence set was empty or none of its sentences is mapped
    NoEvidence,
    /// The target page has no cached fragments
    PageNotCached,
    /// The target page was cached at a different scale than the current one
    ScaleMismatch,
    /// Nothing on the page matched the evidence
    NoMatch,
}

/// Result of completing a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Overlays were drawn
    Rendered(Vec<OverlayHandle>),
    /// The selection finished without overlays
    Empty(EmptyReason),
    /// A newer event superseded the selection; nothing was drawn
    Stale,
}

/// Drives matching, grouping and rendering for the page on display.
#[derive(Debug)]
pub struct HighlightSession {
    matcher: FragmentMatcher,
    grouper: SpatialGrouper,
    renderer: HighlightRenderer,
    settle_delay: Duration,
    state: SessionState,
    token: u64,
    current_page: Option<PageNumber>,
    scale: f32,
}

impl Default for HighlightSession {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl HighlightSession {
    /// Create an idle session at scale 1.0.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            matcher: FragmentMatcher::new(config.matcher.clone()),
            grouper: SpatialGrouper::new(config.grouping.clone()),
            renderer: HighlightRenderer::new(config.render.clone()),
            settle_delay: Duration::from_millis(config.render.settle_delay_ms),
            state: SessionState::Idle,
            token: 0,
            current_page: None,
            scale: 1.0,
        }
    }

    /// Start highlighting an evidence set.
    ///
    /// Clears existing overlays and invalidates any selection in flight. The
    /// returned ticket names the page the host should navigate to before
    /// calling [`complete`](Self::complete) after the settle delay.
    pub fn begin_selection(
        &mut self,
        evidence: &EvidenceSet,
        document: &DocumentState,
        layer: &mut dyn HighlightLayer,
    ) -> SelectionTicket {
        self.invalidate(layer);
        self.state = SessionState::Locating;

        let page = evidence
            .sentence_ids
            .iter()
            .find_map(|id| document.page_for(*id));
        if page.is_some() {
            self.current_page = page;
        }

        log::debug!(
            "Selection {} of {} sentences targets page {:?}",
            self.token,
            evidence.sentence_ids.len(),
            page
        );

        SelectionTicket {
            token: SelectionToken(self.token),
            sentence_ids: evidence.sentence_ids.clone(),
            page,
        }
    }

    /// Match, group and render a selection once its page has settled.
    pub fn complete(
        &mut self,
        ticket: &SelectionTicket,
        document: &DocumentState,
        consumption: Option<&dyn WordConsumptionSource>,
        layer: &mut dyn HighlightLayer,
    ) -> SelectionOutcome {
        if ticket.token != SelectionToken(self.token) {
            log::debug!(
                "Discarding stale selection {} (current {})",
                ticket.token.0,
                self.token
            );
            return SelectionOutcome::Stale;
        }

        let Some(page) = ticket.page else {
            return self.finish_empty(EmptyReason::NoEvidence);
        };
        let Some(cached) = document.pages().get_page(page) else {
            log::debug!("Page {} is not cached; nothing to highlight", page);
            return self.finish_empty(EmptyReason::PageNotCached);
        };
        if (cached.scale - self.scale).abs() > SCALE_EPSILON {
            log::debug!(
                "Page {} cached at scale {} but displayed at {}",
                page,
                cached.scale,
                self.scale
            );
            return self.finish_empty(EmptyReason::ScaleMismatch);
        }

        self.state = SessionState::Matching;
        let fragment_ids: Vec<FragmentId> = cached.fragments.iter().map(|f| f.id()).collect();
        let mut matched = Vec::new();
        for &sentence_id in &ticket.sentence_ids {
            if document.page_for(sentence_id) != Some(page) {
                continue;
            }
            let Some(sentence) = document.corpus().get(sentence_id) else {
                continue;
            };

            let signal = consumption.and_then(|source| {
                fetch_consumption(source, sentence_id, &fragment_ids)
            });
            let result =
                self.matcher
                    .match_sentence_on_page(&sentence.text, &cached.fragments, signal.as_ref());
            if result.is_empty() {
                log::debug!("Sentence {} matched nothing on page {}", sentence_id, page);
                continue;
            }
            matched.push((sentence_id, result));
        }

        self.state = SessionState::Grouping;
        let groups: Vec<Group> = matched
            .iter()
            .flat_map(|(sentence_id, result)| self.grouper.group(*sentence_id, &result.elements))
            .collect();
        if groups.is_empty() {
            return self.finish_empty(EmptyReason::NoMatch);
        }

        let handles = self.renderer.render(&groups, layer);
        self.state = SessionState::Rendered;
        log::info!(
            "Highlighted {} sentences on page {} with {} overlays",
            matched.len(),
            page,
            handles.len()
        );
        SelectionOutcome::Rendered(handles)
    }

    /// The displayed page changed.
    ///
    /// Moving to the page the session already shows (for example the
    /// navigation requested by a ticket) keeps the selection alive.
    pub fn page_changed(&mut self, page: PageNumber, layer: &mut dyn HighlightLayer) {
        if self.current_page == Some(page) {
            return;
        }
        self.current_page = Some(page);
        self.reset(layer);
    }

    /// The display scale changed.
    pub fn scale_changed(&mut self, scale: f32, layer: &mut dyn HighlightLayer) {
        if (self.scale - scale).abs() <= SCALE_EPSILON {
            return;
        }
        self.scale = scale;
        self.reset(layer);
    }

    /// The user cleared the selection.
    pub fn selection_cleared(&mut self, layer: &mut dyn HighlightLayer) {
        self.reset(layer);
    }

    /// Delay to wait after navigation before calling `complete`.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token of the latest selection.
    pub fn token(&self) -> SelectionToken {
        SelectionToken(self.token)
    }

    /// Page on display, if known.
    pub fn current_page(&self) -> Option<PageNumber> {
        self.current_page
    }

    /// Display scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Renderer, for overlay queries such as scroll-into-view.
    pub fn renderer(&self) -> &HighlightRenderer {
        &self.renderer
    }

    fn reset(&mut self, layer: &mut dyn HighlightLayer) {
        self.invalidate(layer);
        self.state = SessionState::Idle;
    }

    fn invalidate(&mut self, layer: &mut dyn HighlightLayer) {
        self.renderer.clear(layer);
        self.token += 1;
    }

    fn finish_empty(&mut self, reason: EmptyReason) -> SelectionOutcome {
        log::debug!("Selection {} produced no overlays: {:?}", self.token, reason);
        self.state = SessionState::Idle;
        SelectionOutcome::Empty(reason)
    }
}

fn fetch_consumption(
    source: &dyn WordConsumptionSource,
    sentence_id: SentenceId,
    fragment_ids: &[FragmentId],
) -> Option<ConsumptionMap> {
    match source.get_word_consumption(sentence_id, fragment_ids) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("Word consumption unavailable for sentence {}: {}", sentence_id, e);
            None
        },
    }
}

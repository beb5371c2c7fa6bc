//! Evidence highlighting pipeline.
//!
//! ```text
//! SentenceSource ──> DocumentState::load_document
//!                          │
//! FragmentSource ──> DocumentState::with_page (PageTextCache)
//!                          │
//!                    DocumentState::relocate (SentenceLocator → PageMapping[])
//!                          │
//! EvidenceSet ─────> HighlightSession::begin_selection → SelectionTicket
//!                          │  (host navigates, waits settle_delay)
//!                    HighlightSession::complete
//!                          ├─ FragmentMatcher (per evidence sentence)
//!                          ├─ SpatialGrouper
//!                          └─ HighlightRenderer → HighlightLayer
//! ```
//!
//! Document data lives in an immutable, versioned [`DocumentState`]; all the
//! mutable UI-facing state (selection token, overlays, current page and scale)
//! lives in a [`HighlightSession`]. All thresholds come from [`EngineConfig`].

pub mod config;
pub mod session;
pub mod state;

pub use config::{
    ConsumptionTiers, EngineConfig, GateConfig, GroupingConfig, LocatorConfig, MatchProfile,
    MatcherConfig, OverlayStyle, RenderConfig,
};
pub use session::{
    EmptyReason, HighlightSession, SelectionOutcome, SelectionTicket, SelectionToken, SessionState,
};
pub use state::DocumentState;

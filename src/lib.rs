// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # Evidence Lens
//!
//! Maps the sentences of a segmented document onto the pages of its rendered
//! view, then highlights the fragments that realize a set of evidence
//! sentences directly on the page.
//!
//! ## Components
//!
//! - **Page Text Cache** ([`cache`]): per-page fragments plus a normalized
//!   full-text search surface with fragment spans
//! - **Sentence-to-Page Locator** ([`locator`]): exact, word-overlap and fuzzy
//!   strategies under a reading-order continuity cursor
//! - **Fragment Matcher** ([`matcher`]): consumption tiers with a gate, then
//!   sequence, spatial-cluster and density-window steps
//! - **Spatial Grouper** ([`grouping`]): complete-linkage grouping with
//!   quality tiers
//! - **Highlight Renderer** ([`render`]): idempotent overlays on an abstract
//!   highlight layer
//!
//! [`pipeline`] ties them together through an immutable, versioned
//! [`DocumentState`] and a token-guarded [`HighlightSession`].
//!
//! ## Quick Start
//!
//! ```
//! use evidence_lens::geometry::Rect;
//! use evidence_lens::locator::SentenceLocator;
//! use evidence_lens::model::{DocumentId, EvidenceSet, SentenceCorpus, TextFragment};
//! use evidence_lens::pipeline::{DocumentState, HighlightSession, SelectionOutcome};
//! use evidence_lens::render::MemoryLayer;
//!
//! let corpus = SentenceCorpus::from_texts(["The committee approved the annual budget."]);
//! let fragments = vec![
//!     TextFragment::new("The committee approved", 1, Rect::new(72.0, 90.0, 140.0, 12.0), 0),
//!     TextFragment::new("the annual budget.", 1, Rect::new(215.0, 90.0, 110.0, 12.0), 1),
//! ];
//!
//! let state = DocumentState::empty()
//!     .load_document(DocumentId::new("report"), corpus)
//!     .with_page(1, fragments, 1.0)
//!     .relocate(&SentenceLocator::default());
//! assert_eq!(state.page_for(0), Some(1));
//!
//! let mut session = HighlightSession::default();
//! let mut layer = MemoryLayer::new();
//! let ticket = session.begin_selection(&EvidenceSet::new(vec![0]), &state, &mut layer);
//! let outcome = session.complete(&ticket, &state, None, &mut layer);
//! assert!(matches!(outcome, SelectionOutcome::Rendered(_)));
//! ```

// Error handling
pub mod error;

// Geometry and data model
pub mod geometry;
pub mod model;

// Text normalization
pub mod text;

// Engine components
pub mod cache;
pub mod grouping;
pub mod locator;
pub mod matcher;
pub mod render;

// Orchestration and collaborators
pub mod pipeline;
pub mod source;
pub mod stats;

pub use error::{Error, Result};
pub use model::{
    DocumentId, EvidenceSet, FragmentId, MatchType, PageMapping, PageNumber, Sentence,
    SentenceCorpus, SentenceId, TextFragment,
};
pub use pipeline::{DocumentState, EngineConfig, HighlightSession, MatchProfile, SelectionOutcome};
pub use stats::MappingStatistics;

// Internal utilities
pub(crate) mod utils {
    use std::cmp::Ordering;

    /// Compare floats for sorting, treating NaN as greater than every number.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_safe_float_cmp_normal() {
            assert_eq!(safe_float_cmp(1.0, 2.0), Ordering::Less);
            assert_eq!(safe_float_cmp(2.0, 1.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(1.5, 1.5), Ordering::Equal);
        }

        #[test]
        fn test_safe_float_cmp_nan() {
            assert_eq!(safe_float_cmp(f32::NAN, f32::NAN), Ordering::Equal);
            assert_eq!(safe_float_cmp(f32::NAN, 1.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(1.0, f32::NAN), Ordering::Less);
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

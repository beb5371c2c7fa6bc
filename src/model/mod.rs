//! Data model shared by every stage of the engine.
//!
//! [`TextFragment`] and [`Sentence`] are supplied by collaborators and never
//! mutated here. [`PageMapping`] is produced by the locator and owned by the
//! document state.

mod fragment;
mod mapping;
mod sentence;

pub use fragment::{normalize_fragments, FragmentId, PageNumber, RawFragment, TextFragment};
pub use mapping::{MatchType, PageMapping};
pub use sentence::{DocumentId, EvidenceSet, Sentence, SentenceCorpus, SentenceId};

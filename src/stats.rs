//! Diagnostics over a page-mapping table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{MatchType, PageMapping};

/// Confidence of at least this is "high".
pub const HIGH_CONFIDENCE: f32 = 0.8;
/// Confidence of at least this is "medium".
pub const MEDIUM_CONFIDENCE: f32 = 0.5;
/// Confidence of at least this is "low"; anything below is "poor".
pub const LOW_CONFIDENCE: f32 = 0.3;

/// Mapping counts per confidence bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    /// Confidence >= 0.8
    pub high: usize,
    /// Confidence in [0.5, 0.8)
    pub medium: usize,
    /// Confidence in [0.3, 0.5)
    pub low: usize,
    /// Confidence < 0.3
    pub poor: usize,
}

/// Summary of how well a corpus was located.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingStatistics {
    /// Number of mappings
    pub total_sentences: usize,
    /// Mappings with non-zero confidence
    pub mapped_sentences: usize,
    /// Mappings per confidence bucket
    pub confidence_distribution: ConfidenceDistribution,
    /// Mappings per match type (every type present, possibly 0)
    pub match_type_distribution: BTreeMap<MatchType, usize>,
}

impl MappingStatistics {
    /// Compute statistics for a mapping table.
    pub fn from_mappings(mappings: &[PageMapping]) -> Self {
        let mut confidence_distribution = ConfidenceDistribution::default();
        let mut match_type_distribution: BTreeMap<MatchType, usize> =
            MatchType::ALL.iter().map(|t| (*t, 0)).collect();

        for mapping in mappings {
            match mapping.confidence {
                c if c >= HIGH_CONFIDENCE => confidence_distribution.high += 1,
                c if c >= MEDIUM_CONFIDENCE => confidence_distribution.medium += 1,
                c if c >= LOW_CONFIDENCE => confidence_distribution.low += 1,
                _ => confidence_distribution.poor += 1,
            }
            *match_type_distribution.entry(mapping.match_type).or_insert(0) += 1;
        }

        Self {
            total_sentences: mappings.len(),
            mapped_sentences: mappings.iter().filter(|m| m.is_mapped()).count(),
            confidence_distribution,
            match_type_distribution,
        }
    }

    /// Fraction of sentences with a non-zero-confidence mapping.
    pub fn mapped_ratio(&self) -> f32 {
        if self.total_sentences == 0 {
            0.0
        } else {
            self.mapped_sentences as f32 / self.total_sentences as f32
        }
    }
}

//! Spatial grouper.
//!
//! Merges the fragments matched for one sentence into visually coherent
//! regions. A sentence broken across columns, or interrupted by a footnote,
//! yields several groups; each carries a quality score that decides how
//! prominently it is drawn.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{center_distance, Rect};
use crate::matcher::MatchedFragment;
use crate::model::SentenceId;
use crate::pipeline::config::GroupingConfig;
use crate::utils::safe_float_cmp;

/// Rendering tier of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Quality >= 0.7 by default
    High,
    /// Quality >= 0.4 by default
    Medium,
    /// Everything else
    Low,
}

impl QualityTier {
    /// Tier of a combined quality score.
    pub fn from_score(score: f32, config: &GroupingConfig) -> Self {
        if score >= config.high_quality {
            QualityTier::High
        } else if score >= config.medium_quality {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }

    /// Lower-case tier name.
    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A spatially coherent set of fragments highlighting one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Sentence the group highlights
    pub sentence_id: SentenceId,
    /// Members in visual reading order
    pub elements: Vec<MatchedFragment>,
    /// Mean consumption of the members
    pub avg_consumption: f32,
    /// Sum of matched sentence words over the members
    pub total_relevant_words: usize,
    /// `max(0, 1 - avg pairwise distance / scale)`; 1 for a single member
    pub spatial_cohesion: f32,
    /// Combined quality score
    pub quality_score: f32,
    /// Tier derived from the quality score
    pub tier: QualityTier,
}

impl Group {
    /// Rectangle enclosing every member, in screen space.
    pub fn bounding_box(&self) -> Option<Rect> {
        Rect::enclosing(self.elements.iter().map(MatchedFragment::bbox))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Clusters matched fragments into groups.
#[derive(Debug, Clone, Default)]
pub struct SpatialGrouper {
    config: GroupingConfig,
}

impl SpatialGrouper {
    /// Create a grouper.
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    /// Grouper settings.
    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }

    /// Group the matched fragments of one sentence.
    ///
    /// Elements are visited in visual reading order (line by line, left to
    /// right). An element joins the current group only when it is within
    /// `max_group_distance` of every member already in it; otherwise it
    /// starts a new group.
    pub fn group(&self, sentence_id: SentenceId, elements: &[MatchedFragment]) -> Vec<Group> {
        let ordered = self.visual_order(elements);
        let mut groups = Vec::new();
        let mut current: Vec<MatchedFragment> = Vec::new();

        for element in ordered {
            let fits = current.iter().all(|member| {
                center_distance(member.bbox(), element.bbox()) <= self.config.max_group_distance
            });
            if !fits {
                groups.push(self.finish(sentence_id, std::mem::take(&mut current)));
            }
            current.push(element);
        }
        if !current.is_empty() {
            groups.push(self.finish(sentence_id, current));
        }

        log::debug!(
            "Sentence {}: {} elements in {} groups",
            sentence_id,
            elements.len(),
            groups.len()
        );
        groups
    }

    /// Sort elements into lines by top edge, then left to right.
    fn visual_order(&self, elements: &[MatchedFragment]) -> Vec<MatchedFragment> {
        let mut by_top: Vec<&MatchedFragment> = elements.iter().collect();
        by_top.sort_by(|a, b| safe_float_cmp(a.bbox().top(), b.bbox().top()));

        let mut lines: Vec<Vec<&MatchedFragment>> = Vec::new();
        let mut line_top = f32::NEG_INFINITY;
        for element in by_top {
            let top = element.bbox().top();
            let same_line = (top - line_top).abs() <= self.config.line_tolerance;
            match lines.last_mut() {
                Some(line) if same_line => line.push(element),
                _ => {
                    lines.push(vec![element]);
                    line_top = top;
                },
            }
        }

        lines
            .into_iter()
            .flat_map(|mut line| {
                line.sort_by(|a, b| safe_float_cmp(a.bbox().left(), b.bbox().left()));
                line
            })
            .cloned()
            .collect()
    }

    fn finish(&self, sentence_id: SentenceId, elements: Vec<MatchedFragment>) -> Group {
        let count = elements.len().max(1) as f32;
        let avg_consumption = elements.iter().map(|e| e.consumption).sum::<f32>() / count;
        let total_relevant_words = elements.iter().map(|e| e.matched_words.len()).sum();
        let spatial_cohesion = self.cohesion(&elements);
        let quality_score = self.config.consumption_weight * avg_consumption
            + self.config.cohesion_weight * spatial_cohesion;

        Group {
            sentence_id,
            elements,
            avg_consumption,
            total_relevant_words,
            spatial_cohesion,
            quality_score,
            tier: QualityTier::from_score(quality_score, &self.config),
        }
    }

    fn cohesion(&self, elements: &[MatchedFragment]) -> f32 {
        if elements.len() < 2 {
            return 1.0;
        }
        let mut total = 0.0;
        let mut pairs = 0usize;
        for (i, a) in elements.iter().enumerate() {
            for b in &elements[i + 1..] {
                total += center_distance(a.bbox(), b.bbox());
                pairs += 1;
            }
        }
        let average = total / pairs as f32;
        (1.0 - average / self.config.cohesion_scale).max(0.0)
    }
}

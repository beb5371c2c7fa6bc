//! Consumption-weighted matching.
//!
//! An upstream aligner may report, per fragment, how much of the fragment's
//! text it attributed to the sentence. Fragments are then sorted into three
//! tiers instead of being scored by raw word overlap:
//!
//! - high: consumption >= 0.6, or >= 0.3 with word relevance >= 0.8
//! - medium: consumption >= 0.2, or relevance >= 0.5, or >= 2 relevant words
//! - low: any relevant word
//!
//! High-tier fragments anchor the match (the best medium one does when there
//! is no high tier). Medium fragments join when close to an anchor.
//! Fragments needed to cover still-missing words join from any tier when
//! within the completion distance.
//!
//! When the earliest accepted fragment already covers most of the sentence
//! with high consumption, the gate opens: every other fragment must then
//! share little vocabulary with that anchor and carry real consumption of
//! its own.

use serde::{Deserialize, Serialize};

use super::{
    ConsumptionMap, ConsumptionSource, FragmentTokens, MatchResult, MatchStrategy, MatchedFragment,
};
use crate::geometry::center_distance;
use crate::model::TextFragment;
use crate::pipeline::config::{ConsumptionTiers, GateConfig, MatcherConfig};
use crate::text::{normalize_for_search, tokenize, words_match, SentenceWords};

/// Quality tier of a fragment on the consumption path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionTier {
    /// Anchors the match
    High,
    /// Joins when spatially connected
    Medium,
    /// Only used to complete missing words
    Low,
}

/// Classify a fragment. Fragments without relevant words have no tier.
pub fn classify(
    tiers: &ConsumptionTiers,
    ratio: f32,
    relevance: f32,
    relevant_words: usize,
) -> Option<ConsumptionTier> {
    if relevant_words == 0 {
        return None;
    }
    if ratio >= tiers.high_consumption
        || (ratio >= tiers.high_assisted_consumption && relevance >= tiers.high_assisted_relevance)
    {
        Some(ConsumptionTier::High)
    } else if ratio >= tiers.medium_consumption
        || relevance >= tiers.medium_relevance
        || relevant_words >= tiers.medium_min_words
    {
        Some(ConsumptionTier::Medium)
    } else {
        Some(ConsumptionTier::Low)
    }
}

/// Fraction of the candidate's distinct tokens that also occur in the anchor.
pub fn gate_overlap(candidate: &[String], anchor: &[String]) -> f32 {
    let mut distinct: Vec<&String> = Vec::new();
    for token in candidate {
        if !distinct.contains(&token) {
            distinct.push(token);
        }
    }
    if distinct.is_empty() {
        return 0.0;
    }
    let shared = distinct.iter().filter(|t| anchor.contains(t)).count();
    shared as f32 / distinct.len() as f32
}

/// A fragment scored against the sentence and the upstream signal.
#[derive(Debug, Clone)]
struct Scored<'a> {
    fragment: &'a TextFragment,
    tokens: &'a [String],
    relevant: Vec<String>,
    coverage: f32,
    ratio: f32,
    tier: ConsumptionTier,
}

impl Scored<'_> {
    fn passes_gate(&self, anchor: &Scored<'_>, gate: &GateConfig) -> bool {
        gate_overlap(self.tokens, anchor.tokens) < gate.max_anchor_overlap
            && self.ratio >= gate.min_consumption
            && self.relevant.len() >= gate.min_words
    }
}

fn score<'a>(
    tiers: &ConsumptionTiers,
    words: &SentenceWords,
    fragment: &'a FragmentTokens<'a>,
    signal: &ConsumptionMap,
) -> Option<Scored<'a>> {
    let upstream = signal.get(&fragment.fragment.id());
    let mut relevant = fragment.hits(&words.significant);

    if let Some(entry) = upstream {
        for reported in &entry.matched_words {
            for token in tokenize(&normalize_for_search(reported)) {
                for word in &words.significant {
                    if words_match(word, &token) && !relevant.contains(word) {
                        relevant.push(word.clone());
                    }
                }
            }
        }
    }

    let relevance = if fragment.tokens.is_empty() {
        0.0
    } else {
        let matching = fragment
            .tokens
            .iter()
            .filter(|t| words.all.iter().any(|w| words_match(w, t)))
            .count();
        matching as f32 / fragment.tokens.len() as f32
    };

    let ratio = upstream.map_or(0.0, |c| c.ratio.clamp(0.0, 1.0));
    let tier = classify(tiers, ratio, relevance, relevant.len())?;
    let coverage = (relevant.len() as f32 / words.significant.len().max(1) as f32).min(1.0);

    Some(Scored {
        fragment: fragment.fragment,
        tokens: &fragment.tokens,
        relevant,
        coverage,
        ratio,
        tier,
    })
}

/// Match a sentence using the upstream consumption signal.
///
/// Returns an empty result when no fragment is accepted, so the caller can
/// fall through to the unweighted steps.
pub fn match_by_consumption(
    config: &MatcherConfig,
    words: &SentenceWords,
    fragments: &[FragmentTokens<'_>],
    signal: &ConsumptionMap,
) -> MatchResult {
    let candidates: Vec<Scored<'_>> = fragments
        .iter()
        .filter_map(|f| score(&config.tiers, words, f, signal))
        .collect();
    if candidates.is_empty() {
        return MatchResult::empty();
    }

    let near = |idx: usize, accepted: &[usize], limit: f32| {
        accepted.iter().any(|&a| {
            center_distance(&candidates[idx].fragment.bbox, &candidates[a].fragment.bbox) <= limit
        })
    };

    let mut initial: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.tier == ConsumptionTier::High)
        .map(|(i, _)| i)
        .collect();
    if initial.is_empty() {
        let best_medium = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.tier == ConsumptionTier::Medium)
            .fold(None::<usize>, |best, (i, c)| match best {
                Some(b)
                    if (candidates[b].coverage, candidates[b].ratio) >= (c.coverage, c.ratio) =>
                {
                    Some(b)
                },
                _ => Some(i),
            });
        initial.extend(best_medium);
    }

    let mut accepted: Vec<usize> = Vec::new();
    let mut gate_anchor: Option<usize> = None;
    if let Some(&anchor) = initial.first() {
        accepted.push(anchor);
        let a = &candidates[anchor];
        if a.coverage >= config.gate.anchor_coverage && a.ratio >= config.gate.anchor_consumption {
            log::debug!(
                "High-consumption gate open (coverage {:.2}, consumption {:.2})",
                a.coverage,
                a.ratio
            );
            gate_anchor = Some(anchor);
        }
    }

    let admits = |idx: usize| match gate_anchor {
        Some(anchor) => {
            let ok = candidates[idx].passes_gate(&candidates[anchor], &config.gate);
            if !ok {
                log::trace!(
                    "Gate rejected fragment {:?}",
                    candidates[idx].fragment.id()
                );
            }
            ok
        },
        None => true,
    };

    for &idx in initial.iter().skip(1) {
        if admits(idx) {
            accepted.push(idx);
        }
    }

    // Mediums connect to anchors only, never to other mediums
    let anchors = accepted.clone();
    for idx in 0..candidates.len() {
        if candidates[idx].tier == ConsumptionTier::Medium
            && !accepted.contains(&idx)
            && near(idx, &anchors, config.connect_distance)
            && admits(idx)
        {
            accepted.push(idx);
        }
    }

    // Complete missing words, most useful candidate first
    let mut rejected: Vec<usize> = Vec::new();
    loop {
        let covered = covered_words(&candidates, &accepted, words);
        let missing: Vec<&String> = words
            .significant
            .iter()
            .filter(|w| !covered.contains(w))
            .collect();
        if missing.is_empty() {
            break;
        }

        let pick = (0..candidates.len())
            .filter(|idx| !accepted.contains(idx) && !rejected.contains(idx))
            .map(|idx| {
                let gain = candidates[idx]
                    .relevant
                    .iter()
                    .filter(|w| missing.contains(w))
                    .count();
                (idx, gain)
            })
            .filter(|&(_, gain)| gain > 0)
            .fold(None::<(usize, usize)>, |best, (idx, gain)| match best {
                Some((_, g)) if g >= gain => best,
                _ => Some((idx, gain)),
            });

        let Some((idx, _)) = pick else {
            break;
        };
        let plausible = accepted.is_empty() || near(idx, &accepted, config.completion_distance);
        if plausible && admits(idx) {
            accepted.push(idx);
        } else {
            rejected.push(idx);
        }
    }

    if accepted.is_empty() {
        return MatchResult::empty();
    }

    accepted.sort_unstable();
    let matched_words = covered_words(&candidates, &accepted, words);
    let confidence = matched_words.len() as f32 / words.significant.len().max(1) as f32;

    MatchResult {
        elements: accepted
            .iter()
            .map(|&idx| {
                let c = &candidates[idx];
                MatchedFragment {
                    fragment: c.fragment.clone(),
                    matched_words: c.relevant.clone(),
                    consumption: c.ratio,
                    source: ConsumptionSource::Upstream,
                    coverage: c.coverage,
                }
            })
            .collect(),
        matched_words,
        confidence: confidence.min(1.0),
        strategy: MatchStrategy::Consumption,
    }
}

/// Significant words covered by the accepted fragments, in sentence order.
fn covered_words(candidates: &[Scored<'_>], accepted: &[usize], words: &SentenceWords) -> Vec<String> {
    words
        .significant
        .iter()
        .filter(|w| accepted.iter().any(|&idx| candidates[idx].relevant.contains(w)))
        .cloned()
        .collect()
}

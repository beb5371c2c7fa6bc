//! Fragment matcher.
//!
//! Given one evidence sentence and the fragments of its page, finds the
//! fragments that realize the sentence. The steps are tried in order:
//!
//! 1. Consumption tiers, when an upstream word-consumption signal is supplied
//!    ([`consumption`]); falls through when it accepts nothing
//! 2. Sequential fragment-sequence matching ([`sequence`])
//! 3. Spatial clustering of independent word hits ([`cluster`])
//! 4. Density-window matching ([`density`])
//!
//! Matching is a pure function of its inputs. Empty sentences, empty pages
//! and pages without any match all produce an empty [`MatchResult`].

pub mod cluster;
pub mod consumption;
pub mod density;
pub mod sequence;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::model::{FragmentId, TextFragment};
use crate::pipeline::config::MatcherConfig;
use crate::text::{normalize_for_search, tokenize, words_match, SentenceWords};

/// Upstream attribution of one fragment to a sentence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    /// Fraction of the fragment's text attributed to the sentence
    pub ratio: f32,
    /// Sentence words the upstream aligner found in the fragment
    #[serde(default)]
    pub matched_words: Vec<String>,
}

impl Consumption {
    /// Create a consumption entry.
    pub fn new(ratio: f32, matched_words: Vec<String>) -> Self {
        Self {
            ratio,
            matched_words,
        }
    }
}

/// Consumption signal for the fragments of one page.
///
/// Keys are the ids of cached fragments. The cache renumbers reading order
/// to `0..n` on ingestion, so sparse or unsorted renderer indices must be
/// translated before a map is built from them.
pub type ConsumptionMap = HashMap<FragmentId, Consumption>;

/// Where an element's consumption value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionSource {
    /// Reported by the upstream aligner
    Upstream,
    /// Estimated from the confidence of the unweighted strategy
    Estimated,
}

/// Step that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Consumption tiers with the high-consumption gate
    Consumption,
    /// Words found in order across consecutive fragments
    Sequence,
    /// Spatial cluster of word hits
    Cluster,
    /// Densest window of fragments
    Density,
    /// Nothing matched
    None,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStrategy::Consumption => "consumption",
            MatchStrategy::Sequence => "sequence",
            MatchStrategy::Cluster => "cluster",
            MatchStrategy::Density => "density",
            MatchStrategy::None => "none",
        };
        f.write_str(name)
    }
}

/// A page fragment selected for a sentence, enriched with match data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedFragment {
    /// The fragment as supplied by the renderer
    pub fragment: TextFragment,
    /// Sentence words found in this fragment
    pub matched_words: Vec<String>,
    /// Consumption ratio in `[0, 1]`
    pub consumption: f32,
    /// Origin of the consumption value
    pub source: ConsumptionSource,
    /// Fraction of the sentence's significant words this fragment covers
    pub coverage: f32,
}

impl MatchedFragment {
    /// Fragment identity.
    pub fn id(&self) -> FragmentId {
        self.fragment.id()
    }

    /// Screen-space bounding box.
    pub fn bbox(&self) -> &Rect {
        &self.fragment.bbox
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Point {
        self.fragment.center()
    }

    /// Reading-order index.
    pub fn reading_order(&self) -> usize {
        self.fragment.reading_order
    }
}

/// Outcome of matching one sentence on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Selected fragments in reading order
    pub elements: Vec<MatchedFragment>,
    /// Sentence words covered by the selection
    pub matched_words: Vec<String>,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// Step that produced the match
    pub strategy: MatchStrategy,
}

impl MatchResult {
    /// The no-match result.
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
            matched_words: Vec::new(),
            confidence: 0.0,
            strategy: MatchStrategy::None,
        }
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A page fragment with its search tokens.
#[derive(Debug, Clone)]
pub struct FragmentTokens<'a> {
    /// The fragment
    pub fragment: &'a TextFragment,
    /// Tokens of the normalized fragment text
    pub tokens: Vec<String>,
}

impl<'a> FragmentTokens<'a> {
    /// Tokenize a fragment.
    pub fn new(fragment: &'a TextFragment) -> Self {
        Self {
            fragment,
            tokens: tokenize(&normalize_for_search(&fragment.text)),
        }
    }

    /// Distinct words of `words` present in this fragment, in `words` order.
    pub fn hits(&self, words: &[String]) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for word in words {
            if !found.contains(word) && self.tokens.iter().any(|t| words_match(word, t)) {
                found.push(word.clone());
            }
        }
        found
    }

    /// Whether any of `words` is present.
    pub fn contains_any(&self, words: &[String]) -> bool {
        words
            .iter()
            .any(|w| self.tokens.iter().any(|t| words_match(w, t)))
    }
}

/// Tokenize fragments in reading order.
pub(crate) fn tokenize_fragments(fragments: &[TextFragment]) -> Vec<FragmentTokens<'_>> {
    let mut indexed: Vec<FragmentTokens<'_>> = fragments.iter().map(FragmentTokens::new).collect();
    indexed.sort_by_key(|f| f.fragment.reading_order);
    indexed
}

/// Finds the fragments that realize a sentence on a page.
#[derive(Debug, Clone, Default)]
pub struct FragmentMatcher {
    config: MatcherConfig,
}

impl FragmentMatcher {
    /// Create a matcher.
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Matcher settings.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match a sentence against the fragments of one page.
    ///
    /// `consumption` is the optional upstream signal. When it is absent,
    /// empty, or accepts nothing, the unweighted steps run instead.
    pub fn match_sentence_on_page(
        &self,
        sentence: &str,
        fragments: &[TextFragment],
        consumption: Option<&ConsumptionMap>,
    ) -> MatchResult {
        let words = SentenceWords::from_text(sentence, None);
        if words.is_empty() || fragments.is_empty() {
            return MatchResult::empty();
        }

        let indexed = tokenize_fragments(fragments);

        if let Some(signal) = consumption.filter(|m| !m.is_empty()) {
            let result = consumption::match_by_consumption(&self.config, &words, &indexed, signal);
            if !result.is_empty() {
                log::debug!(
                    "Consumption tiers matched {} fragments ({:.2})",
                    result.elements.len(),
                    result.confidence
                );
                return result;
            }
            log::debug!("Consumption tiers accepted nothing; using unweighted steps");
        }

        let found = sequence::find_sequence(&self.config, &words, &indexed)
            .map(|m| (MatchStrategy::Sequence, m))
            .or_else(|| {
                cluster::find_cluster(&self.config, &words, &indexed)
                    .map(|m| (MatchStrategy::Cluster, m))
            })
            .or_else(|| {
                density::find_dense_window(&self.config, &words, &indexed)
                    .map(|m| (MatchStrategy::Density, m))
            });

        if let Some((strategy, step)) = found {
            log::debug!(
                "{} step matched {} fragments ({:.2})",
                strategy,
                step.elements.len(),
                step.confidence
            );
            return step.into_result(&words, strategy);
        }

        log::debug!("No fragments matched {:?}", words.normalized);
        MatchResult::empty()
    }
}

/// Raw output of an unweighted step: fragment positions and their word hits.
#[derive(Debug, Clone)]
pub struct StepMatch<'a> {
    /// Selected fragments with the sentence words found in each
    pub elements: Vec<(&'a TextFragment, Vec<String>)>,
    /// Step confidence in `[0, 1]`
    pub confidence: f32,
}

impl StepMatch<'_> {
    /// Enrich the selection, estimating consumption from the step confidence.
    fn into_result(self, words: &SentenceWords, strategy: MatchStrategy) -> MatchResult {
        let total = words.significant.len().max(1) as f32;
        let confidence = self.confidence.clamp(0.0, 1.0);
        let mut covered: Vec<String> = Vec::new();

        let elements = self
            .elements
            .into_iter()
            .map(|(fragment, matched_words)| {
                let significant_hits = matched_words
                    .iter()
                    .filter(|w| words.significant.contains(w))
                    .count();
                for word in &matched_words {
                    if !covered.contains(word) {
                        covered.push(word.clone());
                    }
                }
                MatchedFragment {
                    fragment: fragment.clone(),
                    matched_words,
                    consumption: confidence,
                    source: ConsumptionSource::Estimated,
                    coverage: (significant_hits as f32 / total).min(1.0),
                }
            })
            .collect();

        MatchResult {
            elements,
            matched_words: covered,
            confidence,
            strategy,
        }
    }
}

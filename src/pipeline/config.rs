//! Unified configuration for the evidence pipeline.
//!
//! Every threshold used by the locator, matcher, grouper and renderer lives
//! here as a named field. The defaults are empirically tuned values; none of
//! them has a derivation beyond "works on typical academic PDFs", so they are
//! all overridable, either in code through the `with_*` setters or from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locator::MAX_OVERLAP_WORDS;

/// Layout profile used to pick tuned defaults.
///
/// - Default: single-column prose, born-digital text
/// - MultiColumn: two or more columns; tighter spatial distances so
///   fragments from the neighbouring column are not pulled in
/// - Scanned: OCR text layers; looser string thresholds for recognition noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchProfile {
    /// Balanced defaults
    #[default]
    Default,
    /// Multi-column layouts (papers, newspapers)
    MultiColumn,
    /// OCR'd scans with noisy text
    Scanned,
}

impl MatchProfile {
    /// Create the tuned configuration for this profile.
    pub fn create_config(&self) -> EngineConfig {
        match self {
            Self::Default => EngineConfig::default(),
            Self::MultiColumn => Self::multi_column_config(),
            Self::Scanned => Self::scanned_config(),
        }
    }

    /// Parse a profile name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "default" => Some(Self::Default),
            "multi_column" | "multicolumn" => Some(Self::MultiColumn),
            "scanned" | "ocr" => Some(Self::Scanned),
            _ => None,
        }
    }

    fn multi_column_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.matcher.cluster_distance = 40.0;
        config.matcher.connect_distance = 40.0;
        config.matcher.completion_distance = 60.0;
        config.grouping.max_group_distance = 50.0;
        config
    }

    fn scanned_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.locator.word_overlap_min_confidence = 0.5;
        config.locator.fuzzy_min_confidence = 0.55;
        config.matcher.min_density = 0.25;
        config.matcher.sequence_gap_factor = 4;
        config
    }
}

/// Sentence-to-page locator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Exact-match probe lengths in characters, longest first
    pub exact_probe_lengths: Vec<usize>,
    /// Exact matches above this confidence are accepted immediately
    pub exact_accept_confidence: f32,
    /// Weaker exact hits (shorter probes) still count above this confidence
    pub exact_min_confidence: f32,
    /// Cap on significant words extracted from a sentence
    pub max_significant_words: usize,
    /// Word-overlap matching needs at least this many significant words
    pub min_overlap_words: usize,
    /// Minimum word-overlap confidence
    pub word_overlap_min_confidence: f32,
    /// Fuzzy chunk size in characters
    pub fuzzy_chunk_size: usize,
    /// Fraction of each fuzzy chunk shared with the next one
    pub fuzzy_chunk_overlap: f32,
    /// Minimum fuzzy confidence
    pub fuzzy_min_confidence: f32,
    /// Page density cap as a multiple of the average sentences per page
    pub density_cap_factor: f32,
    /// Sentences shorter than this (in characters) are checked for header patterns
    pub short_sentence_length: usize,
    /// Confidence cap for header/footer-like short sentences
    pub header_confidence_cap: f32,
    /// Confidence multiplier for clamped and untrusted matches
    pub fallback_penalty: f32,
    /// Matches below this confidence may not move away from the cursor page
    pub min_jump_confidence: f32,
    /// Word-overlap and fuzzy search look this many pages past the cursor (None = all)
    pub max_lookahead_pages: Option<u32>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            exact_probe_lengths: vec![100, 50, 30],
            exact_accept_confidence: 0.8,
            exact_min_confidence: 0.5,
            max_significant_words: 20,
            min_overlap_words: 3,
            word_overlap_min_confidence: 0.6,
            fuzzy_chunk_size: 200,
            fuzzy_chunk_overlap: 0.2,
            fuzzy_min_confidence: 0.65,
            density_cap_factor: 1.5,
            short_sentence_length: 20,
            header_confidence_cap: 0.3,
            fallback_penalty: 0.5,
            min_jump_confidence: 0.5,
            max_lookahead_pages: Some(10),
        }
    }
}

/// Consumption tier thresholds for the fragment matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumptionTiers {
    /// High tier: consumption at or above this
    pub high_consumption: f32,
    /// High tier (assisted): consumption at or above this...
    pub high_assisted_consumption: f32,
    /// ...together with word relevance at or above this
    pub high_assisted_relevance: f32,
    /// Medium tier: consumption at or above this
    pub medium_consumption: f32,
    /// Medium tier: or word relevance at or above this
    pub medium_relevance: f32,
    /// Medium tier: or at least this many relevant words
    pub medium_min_words: usize,
}

impl Default for ConsumptionTiers {
    fn default() -> Self {
        Self {
            high_consumption: 0.6,
            high_assisted_consumption: 0.3,
            high_assisted_relevance: 0.8,
            medium_consumption: 0.2,
            medium_relevance: 0.5,
            medium_min_words: 2,
        }
    }
}

/// High-consumption gate thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// The gate opens when the earliest anchor covers at least this much of the sentence...
    pub anchor_coverage: f32,
    /// ...and has at least this consumption
    pub anchor_consumption: f32,
    /// Later candidates must share less than this fraction of words with the anchor
    pub max_anchor_overlap: f32,
    /// Later candidates need at least this consumption
    pub min_consumption: f32,
    /// Later candidates need at least this many matched words
    pub min_words: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            anchor_coverage: 0.6,
            anchor_consumption: 0.5,
            max_anchor_overlap: 0.4,
            min_consumption: 0.3,
            min_words: 2,
        }
    }
}

/// Fragment matcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Longest word sequence tried by sequential matching
    pub max_sequence_length: usize,
    /// Shortest word sequence tried by sequential matching
    pub min_sequence_length: usize,
    /// Allowed non-matching fragments inside a sequence, as a multiple of its length
    pub sequence_gap_factor: usize,
    /// Center distance joining word hits into one cluster
    pub cluster_distance: f32,
    /// Minimum fraction of significant words a cluster must cover
    pub min_cluster_coverage: f32,
    /// Density window size in fragments
    pub density_window: usize,
    /// Minimum word density of the best window
    pub min_density: f32,
    /// Consumption tiers
    pub tiers: ConsumptionTiers,
    /// Medium-tier elements must be this close to an accepted element
    pub connect_distance: f32,
    /// Looser distance used while completing missing words
    pub completion_distance: f32,
    /// High-consumption gate
    pub gate: GateConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: 6,
            min_sequence_length: 3,
            sequence_gap_factor: 3,
            cluster_distance: 50.0,
            min_cluster_coverage: 0.3,
            density_window: 10,
            min_density: 0.3,
            tiers: ConsumptionTiers::default(),
            connect_distance: 50.0,
            completion_distance: 80.0,
            gate: GateConfig::default(),
        }
    }
}

/// Spatial grouper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Fragments whose tops differ by at most this are on the same line
    pub line_tolerance: f32,
    /// Members of one group are never farther apart than this (center to center)
    pub max_group_distance: f32,
    /// Average pairwise distance at which cohesion reaches zero
    pub cohesion_scale: f32,
    /// Weight of average consumption in the combined quality
    pub consumption_weight: f32,
    /// Weight of spatial cohesion in the combined quality
    pub cohesion_weight: f32,
    /// Quality at or above this is high tier
    pub high_quality: f32,
    /// Quality at or above this is medium tier
    pub medium_quality: f32,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 5.0,
            max_group_distance: 60.0,
            cohesion_scale: 100.0,
            consumption_weight: 0.6,
            cohesion_weight: 0.4,
            high_quality: 0.7,
            medium_quality: 0.4,
        }
    }
}

/// Visual style of one overlay tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Class name applied to the overlay node
    pub class_name: String,
    /// Fill colour (RGBA, 0.0 - 1.0)
    pub color: [f32; 4],
}

impl OverlayStyle {
    /// Create a style.
    pub fn new(class_name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            class_name: class_name.into(),
            color,
        }
    }
}

/// Highlight renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Delay the host should wait after navigation before running the pipeline
    pub settle_delay_ms: u64,
    /// Style of high-quality overlays
    pub high: OverlayStyle,
    /// Style of medium-quality overlays
    pub medium: OverlayStyle,
    /// Style of low-quality overlays
    pub low: OverlayStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            high: OverlayStyle::new("evidence-highlight-high", [1.0, 0.85, 0.0, 0.45]), // Amber
            medium: OverlayStyle::new("evidence-highlight-medium", [1.0, 0.65, 0.0, 0.3]), // Orange
            low: OverlayStyle::new("evidence-highlight-low", [0.6, 0.6, 0.6, 0.25]), // Grey
        }
    }
}

/// Configuration of the whole engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sentence-to-page locator
    pub locator: LocatorConfig,
    /// Fragment matcher
    pub matcher: MatcherConfig,
    /// Spatial grouper
    pub grouping: GroupingConfig,
    /// Highlight renderer
    pub render: RenderConfig,
}

impl EngineConfig {
    /// Create config for a layout profile.
    pub fn for_profile(profile: MatchProfile) -> Self {
        profile.create_config()
    }

    /// Parse a (possibly partial) JSON configuration; missing fields keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Set the maximum group distance.
    pub fn with_max_group_distance(mut self, distance: f32) -> Self {
        self.grouping.max_group_distance = distance;
        self
    }

    /// Set the matcher's cluster distance.
    pub fn with_cluster_distance(mut self, distance: f32) -> Self {
        self.matcher.cluster_distance = distance;
        self
    }

    /// Set the density window size and minimum density.
    pub fn with_density_window(mut self, window: usize, min_density: f32) -> Self {
        self.matcher.density_window = window;
        self.matcher.min_density = min_density;
        self
    }

    /// Set the locator's page lookahead (None = whole document).
    pub fn with_max_lookahead_pages(mut self, pages: Option<u32>) -> Self {
        self.locator.max_lookahead_pages = pages;
        self
    }

    /// Set the settle delay.
    pub fn with_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.render.settle_delay_ms = delay_ms;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let l = &self.locator;
        if l.exact_probe_lengths.is_empty() || l.exact_probe_lengths.contains(&0) {
            return Err(invalid("exact_probe_lengths must be non-empty and positive"));
        }
        if l.max_significant_words == 0 || l.max_significant_words > MAX_OVERLAP_WORDS {
            return Err(invalid(&format!(
                "max_significant_words must be within 1..={}",
                MAX_OVERLAP_WORDS
            )));
        }
        if l.fuzzy_chunk_size == 0 {
            return Err(invalid("fuzzy_chunk_size must be positive"));
        }
        if !(0.0..1.0).contains(&l.fuzzy_chunk_overlap) {
            return Err(invalid("fuzzy_chunk_overlap must be within [0, 1)"));
        }
        if !l.density_cap_factor.is_finite() || l.density_cap_factor <= 0.0 {
            return Err(invalid("density_cap_factor must be positive"));
        }
        check_unit("exact_accept_confidence", l.exact_accept_confidence)?;
        check_unit("exact_min_confidence", l.exact_min_confidence)?;
        check_unit("word_overlap_min_confidence", l.word_overlap_min_confidence)?;
        check_unit("fuzzy_min_confidence", l.fuzzy_min_confidence)?;
        check_unit("header_confidence_cap", l.header_confidence_cap)?;
        check_unit("fallback_penalty", l.fallback_penalty)?;
        check_unit("min_jump_confidence", l.min_jump_confidence)?;

        let m = &self.matcher;
        if m.min_sequence_length == 0 || m.min_sequence_length > m.max_sequence_length {
            return Err(invalid(
                "sequence lengths must satisfy 0 < min_sequence_length <= max_sequence_length",
            ));
        }
        if m.density_window == 0 {
            return Err(invalid("density_window must be positive"));
        }
        check_unit("min_density", m.min_density)?;
        check_unit("min_cluster_coverage", m.min_cluster_coverage)?;
        check_distance("cluster_distance", m.cluster_distance)?;
        check_distance("connect_distance", m.connect_distance)?;
        check_distance("completion_distance", m.completion_distance)?;
        check_unit("gate.max_anchor_overlap", m.gate.max_anchor_overlap)?;

        let g = &self.grouping;
        check_distance("max_group_distance", g.max_group_distance)?;
        check_distance("cohesion_scale", g.cohesion_scale)?;
        check_distance("line_tolerance", g.line_tolerance)?;
        if g.medium_quality > g.high_quality {
            return Err(invalid("medium_quality must not exceed high_quality"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig(message.to_string())
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

fn check_distance(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{} must be positive, got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.locator.exact_probe_lengths, vec![100, 50, 30]);
        assert_eq!(config.matcher.cluster_distance, 50.0);
        assert_eq!(config.grouping.max_group_distance, 60.0);
        assert_eq!(config.render.settle_delay_ms, 100);
    }

    #[test]
    fn test_profiles_are_valid() {
        for profile in [MatchProfile::Default, MatchProfile::MultiColumn, MatchProfile::Scanned] {
            assert!(profile.create_config().validate().is_ok(), "{:?}", profile);
        }
        let multi = MatchProfile::MultiColumn.create_config();
        assert!(multi.grouping.max_group_distance < 60.0);
        let scanned = MatchProfile::Scanned.create_config();
        assert!(scanned.locator.fuzzy_min_confidence < 0.65);
    }

    #[test]
    fn test_profile_from_name() {
        assert_eq!(MatchProfile::from_name("multi-column"), Some(MatchProfile::MultiColumn));
        assert_eq!(MatchProfile::from_name("OCR"), Some(MatchProfile::Scanned));
        assert_eq!(MatchProfile::from_name("nope"), None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"grouping": {"max_group_distance": 75.0}}"#).unwrap();
        assert_eq!(config.grouping.max_group_distance, 75.0);
        assert_eq!(config.grouping.line_tolerance, 5.0);
        assert_eq!(config.matcher, MatcherConfig::default());
    }

    #[test]
    fn test_invalid_json_values_rejected() {
        let err = EngineConfig::from_json_str(r#"{"matcher": {"min_density": 1.5}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = EngineConfig::from_json_str(r#"{"locator": {"exact_probe_lengths": []}}"#)
            .unwrap_err();
        assert!(format!("{}", err).contains("exact_probe_lengths"));
    }

    #[test]
    fn test_builder_setters() {
        let config = EngineConfig::default()
            .with_max_group_distance(42.0)
            .with_cluster_distance(30.0)
            .with_density_window(8, 0.4)
            .with_max_lookahead_pages(None)
            .with_settle_delay_ms(0);
        assert_eq!(config.grouping.max_group_distance, 42.0);
        assert_eq!(config.matcher.cluster_distance, 30.0);
        assert_eq!(config.matcher.density_window, 8);
        assert_eq!(config.matcher.min_density, 0.4);
        assert_eq!(config.locator.max_lookahead_pages, None);
        assert_eq!(config.render.settle_delay_ms, 0);
    }

    #[test]
    fn test_sequence_lengths_validated() {
        let mut config = EngineConfig::default();
        config.matcher.min_sequence_length = 7;
        assert!(config.validate().is_err());
    }
}

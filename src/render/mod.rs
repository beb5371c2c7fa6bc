//! Highlight renderer.
//!
//! Turns groups into styled, axis-aligned overlays on a dedicated highlight
//! layer. The layer is abstract ([`HighlightLayer`]) so the host decides what
//! an overlay node is; [`MemoryLayer`] keeps them in memory for tests and the
//! command-line tool.
//!
//! Rendering never touches the page's text layer. Groups whose enclosing
//! rectangle has no area are dropped individually.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::grouping::{Group, QualityTier};
use crate::model::SentenceId;
use crate::pipeline::config::{OverlayStyle, RenderConfig};

/// Opaque handle of an overlay node, unique for the renderer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayHandle(pub u64);

/// Stable identity of an overlay: which group of which sentence it draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayKey {
    /// Sentence the overlay highlights
    pub sentence_id: SentenceId,
    /// Index of the group in the rendered group list
    pub group_index: usize,
}

/// One highlight rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Identity of the overlay
    pub key: OverlayKey,
    /// Rectangle in screen space at the page's current scale
    pub rect: Rect,
    /// Quality tier
    pub tier: QualityTier,
    /// Group quality score
    pub quality_score: f32,
    /// Class name of the tier style
    pub class_name: String,
    /// Fill colour of the tier style (RGBA)
    pub color: [f32; 4],
}

/// The page container's highlight layer.
pub trait HighlightLayer {
    /// Append an overlay node.
    fn append(&mut self, handle: OverlayHandle, overlay: &Overlay);

    /// Remove an overlay node. Returns false if it was not present.
    fn remove(&mut self, handle: OverlayHandle) -> bool;
}

/// In-memory highlight layer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayer {
    nodes: IndexMap<OverlayHandle, Overlay>,
}

impl MemoryLayer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays currently on the layer, in insertion order.
    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.nodes.values()
    }

    /// Overlay behind a handle.
    pub fn get(&self, handle: OverlayHandle) -> Option<&Overlay> {
        self.nodes.get(&handle)
    }

    /// Number of overlays on the layer.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the layer is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl HighlightLayer for MemoryLayer {
    fn append(&mut self, handle: OverlayHandle, overlay: &Overlay) {
        self.nodes.insert(handle, overlay.clone());
    }

    fn remove(&mut self, handle: OverlayHandle) -> bool {
        self.nodes.shift_remove(&handle).is_some()
    }
}

/// Draws groups as overlays and remembers what it drew.
#[derive(Debug, Clone, Default)]
pub struct HighlightRenderer {
    config: RenderConfig,
    drawn: IndexMap<OverlayHandle, Overlay>,
    next_handle: u64,
}

impl HighlightRenderer {
    /// Create a renderer.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            drawn: IndexMap::new(),
            next_handle: 0,
        }
    }

    /// Renderer settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Style used for a tier.
    pub fn style(&self, tier: QualityTier) -> &OverlayStyle {
        match tier {
            QualityTier::High => &self.config.high,
            QualityTier::Medium => &self.config.medium,
            QualityTier::Low => &self.config.low,
        }
    }

    /// Replace everything previously drawn with overlays for `groups`.
    ///
    /// Returns the handles of the new overlays in group order. Calling it
    /// again with the same groups yields the same overlay set.
    pub fn render(&mut self, groups: &[Group], layer: &mut dyn HighlightLayer) -> Vec<OverlayHandle> {
        self.clear(layer);

        let mut handles = Vec::with_capacity(groups.len());
        for (group_index, group) in groups.iter().enumerate() {
            let rect = match group.bounding_box() {
                Some(rect) if rect.is_drawable() => rect,
                other => {
                    log::debug!(
                        "Dropping group {} of sentence {}: invalid geometry {:?}",
                        group_index,
                        group.sentence_id,
                        other
                    );
                    continue;
                },
            };

            let style = self.style(group.tier);
            let overlay = Overlay {
                key: OverlayKey {
                    sentence_id: group.sentence_id,
                    group_index,
                },
                rect,
                tier: group.tier,
                quality_score: group.quality_score,
                class_name: style.class_name.clone(),
                color: style.color,
            };

            let handle = OverlayHandle(self.next_handle);
            self.next_handle += 1;
            layer.append(handle, &overlay);
            self.drawn.insert(handle, overlay);
            handles.push(handle);
        }

        log::debug!("Rendered {} of {} groups", handles.len(), groups.len());
        handles
    }

    /// Remove every overlay this renderer drew.
    pub fn clear(&mut self, layer: &mut dyn HighlightLayer) {
        for (handle, _) in self.drawn.drain(..) {
            if !layer.remove(handle) {
                log::trace!("Overlay {:?} was already gone from the layer", handle);
            }
        }
    }

    /// Overlays currently drawn, in render order.
    pub fn overlays(&self) -> impl Iterator<Item = (&OverlayHandle, &Overlay)> {
        self.drawn.iter()
    }

    /// Overlay behind a handle.
    pub fn overlay(&self, handle: OverlayHandle) -> Option<&Overlay> {
        self.drawn.get(&handle)
    }

    /// Handles of the overlays drawn for a sentence.
    pub fn handles_for(&self, sentence_id: SentenceId) -> Vec<OverlayHandle> {
        self.drawn
            .iter()
            .filter(|(_, o)| o.key.sentence_id == sentence_id)
            .map(|(h, _)| *h)
            .collect()
    }

    /// Topmost overlay of a sentence, for scroll-into-view.
    pub fn first_handle(&self, sentence_id: SentenceId) -> Option<OverlayHandle> {
        self.drawn
            .iter()
            .filter(|(_, o)| o.key.sentence_id == sentence_id)
            .min_by(|(_, a), (_, b)| {
                crate::utils::safe_float_cmp(a.rect.top(), b.rect.top())
                    .then(crate::utils::safe_float_cmp(a.rect.left(), b.rect.left()))
            })
            .map(|(h, _)| *h)
    }

    /// Number of overlays currently drawn.
    pub fn len(&self) -> usize {
        self.drawn.len()
    }

    /// Whether nothing is drawn.
    pub fn is_empty(&self) -> bool {
        self.drawn.is_empty()
    }
}

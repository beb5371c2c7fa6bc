//! Positioned text fragments as reported by the page renderer.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{CoordinateSpace, Point, RawBox, Rect};

/// Page number as used by the host renderer.
pub type PageNumber = u32;

/// Stable identity of a fragment: its page plus its reading-order index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId {
    /// Page the fragment lives on
    pub page: PageNumber,
    /// Reading-order index within the page
    pub index: usize,
}

impl FragmentId {
    /// Create a fragment id.
    pub fn new(page: PageNumber, index: usize) -> Self {
        Self { page, index }
    }
}

/// One positioned run of text on a rendered page, in screen space.
///
/// Immutable for the lifetime of the page at a given scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// The text content as rendered
    pub text: String,
    /// Page number
    pub page: PageNumber,
    /// Bounding box in screen space at the page's current scale
    pub bbox: Rect,
    /// Sequential reading-order index (0 = first on the page)
    pub reading_order: usize,
}

impl TextFragment {
    /// Create a fragment that is already in screen space.
    pub fn new(text: impl Into<String>, page: PageNumber, bbox: Rect, reading_order: usize) -> Self {
        Self {
            text: text.into(),
            page,
            bbox,
            reading_order,
        }
    }

    /// Identity of this fragment.
    pub fn id(&self) -> FragmentId {
        FragmentId::new(self.page, self.reading_order)
    }

    /// Center of the fragment's bounding box.
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}

/// A fragment exactly as the renderer hands it over, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFragment {
    /// The text content
    pub text: String,
    /// Page number
    pub page: PageNumber,
    /// Box in renderer-specific encoding
    pub bbox: RawBox,
    /// Renderer-defined reading order, if it reports one
    #[serde(default)]
    pub reading_order: Option<usize>,
}

impl RawFragment {
    /// Convert into a screen-space fragment.
    ///
    /// `supply_order` is used when the renderer did not report a reading order.
    pub fn normalize(&self, space: &CoordinateSpace, supply_order: usize) -> Result<TextFragment> {
        let bbox = space.normalize(self.page, &self.bbox)?;
        Ok(TextFragment {
            text: self.text.clone(),
            page: self.page,
            bbox,
            reading_order: self.reading_order.unwrap_or(supply_order),
        })
    }
}

/// Normalize every fragment of one page.
///
/// Fragments that belong to another page or whose geometry is invalid are
/// logged and skipped. The survivors are sorted by reported reading order
/// (stable, so ties keep supply order) and re-indexed `0..n` so that
/// [`FragmentId`]s are unique.
pub fn normalize_fragments(
    page: PageNumber,
    raw: &[RawFragment],
    space: &CoordinateSpace,
) -> Vec<TextFragment> {
    let mut fragments: Vec<TextFragment> = raw
        .iter()
        .enumerate()
        .filter_map(|(supply_order, fragment)| {
            if fragment.page != page {
                log::warn!(
                    "Skipping fragment reported for page {} while ingesting page {}",
                    fragment.page,
                    page
                );
                return None;
            }
            match fragment.normalize(space, supply_order) {
                Ok(normalized) => Some(normalized),
                Err(e) => {
                    log::warn!("Dropping fragment {:?}: {}", fragment.text, e);
                    None
                },
            }
        })
        .collect();

    fragments.sort_by_key(|f| f.reading_order);
    for (index, fragment) in fragments.iter_mut().enumerate() {
        fragment.reading_order = index;
    }
    fragments
}

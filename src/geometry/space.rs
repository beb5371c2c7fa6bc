//! Coordinate-space normalization at the ingestion boundary.
//!
//! Renderers report fragment boxes in several encodings: corner pairs
//! (`x0, y0, x1, y1`) or origin plus size, measured either from the top-left
//! of the page (screen/canvas convention) or from the bottom-left (PDF user
//! space). Everything is converted to top-left screen space at the current
//! scale here, exactly once, so nothing downstream re-derives it.

use serde::{Deserialize, Serialize};

use super::Rect;
use crate::error::{Error, Result};

/// Box encoding as supplied by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawBox {
    /// Two opposite corners. Corner order is not trusted.
    Corners {
        /// First corner x
        x0: f32,
        /// First corner y
        y0: f32,
        /// Opposite corner x
        x1: f32,
        /// Opposite corner y
        y1: f32,
    },
    /// Origin corner plus dimensions.
    Xywh {
        /// Origin x
        x: f32,
        /// Origin y (top edge for top-left origin, bottom edge for bottom-left)
        y: f32,
        /// Width
        width: f32,
        /// Height
        height: f32,
    },
}

/// Where the y axis starts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Screen convention: y grows downwards from the top edge.
    #[default]
    TopLeft,
    /// PDF user-space convention: y grows upwards from the bottom edge.
    BottomLeft {
        /// Unscaled page height used to flip the y axis
        page_height: f32,
    },
}

/// Coordinate system a batch of raw boxes was captured in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    /// Axis origin
    #[serde(default)]
    pub origin: Origin,
    /// Multiplier from raw units to current screen units (zoom)
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self::screen()
    }
}

impl CoordinateSpace {
    /// Top-left origin at scale 1.0.
    pub fn screen() -> Self {
        Self {
            origin: Origin::TopLeft,
            scale: 1.0,
        }
    }

    /// Bottom-left origin (PDF user space) for a page of the given height.
    pub fn pdf(page_height: f32) -> Self {
        Self {
            origin: Origin::BottomLeft { page_height },
            scale: 1.0,
        }
    }

    /// Set the zoom factor.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Convert a raw box into a screen-space rectangle.
    ///
    /// Rejects non-finite values and a non-positive scale. Zero-area boxes are
    /// allowed through: they are valid text positions and are only dropped
    /// when a highlight rectangle built from them turns out empty.
    pub fn normalize(&self, page: u32, raw: &RawBox) -> Result<Rect> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidGeometry {
                page,
                reason: format!("scale must be positive, got {}", self.scale),
            });
        }

        let (left, right, low, high) = match *raw {
            RawBox::Corners { x0, y0, x1, y1 } => (x0.min(x1), x0.max(x1), y0.min(y1), y0.max(y1)),
            RawBox::Xywh {
                x,
                y,
                width,
                height,
            } => {
                if width < 0.0 || height < 0.0 {
                    return Err(Error::InvalidGeometry {
                        page,
                        reason: format!("negative size {}x{}", width, height),
                    });
                }
                (x, x + width, y, y + height)
            },
        };

        for (name, value) in [("left", left), ("right", right), ("low", low), ("high", high)] {
            if !value.is_finite() {
                return Err(Error::InvalidGeometry {
                    page,
                    reason: format!("non-finite {} coordinate", name),
                });
            }
        }

        // For a top-left origin `low` is the top edge; for bottom-left it is the
        // bottom edge and the box must be flipped.
        let (top, bottom) = match self.origin {
            Origin::TopLeft => (low, high),
            Origin::BottomLeft { page_height } => {
                if !page_height.is_finite() || page_height <= 0.0 {
                    return Err(Error::InvalidGeometry {
                        page,
                        reason: format!("page height must be positive, got {}", page_height),
                    });
                }
                (page_height - high, page_height - low)
            },
        };

        Ok(Rect::from_points(left, top, right, bottom).scaled(self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_left_xywh_is_identity() {
        let space = CoordinateSpace::screen();
        let rect = space
            .normalize(
                1,
                &RawBox::Xywh {
                    x: 10.0,
                    y: 20.0,
                    width: 30.0,
                    height: 12.0,
                },
            )
            .unwrap();
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 12.0));
    }

    #[test]
    fn test_swapped_corners_are_reordered() {
        let space = CoordinateSpace::screen();
        let rect = space
            .normalize(
                1,
                &RawBox::Corners {
                    x0: 40.0,
                    y0: 32.0,
                    x1: 10.0,
                    y1: 20.0,
                },
            )
            .unwrap();
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 12.0));
    }

    #[test]
    fn test_bottom_left_origin_is_flipped() {
        // 792pt letter page, a line sitting 100pt above the bottom edge
        let space = CoordinateSpace::pdf(792.0);
        let rect = space
            .normalize(
                2,
                &RawBox::Corners {
                    x0: 72.0,
                    y0: 100.0,
                    x1: 272.0,
                    y1: 112.0,
                },
            )
            .unwrap();
        assert_eq!(rect.top(), 680.0);
        assert_eq!(rect.bottom(), 692.0);
        assert_eq!(rect.left(), 72.0);
    }

    #[test]
    fn test_scale_applied_after_flip() {
        let space = CoordinateSpace::pdf(100.0).with_scale(2.0);
        let rect = space
            .normalize(
                1,
                &RawBox::Xywh {
                    x: 10.0,
                    y: 10.0,
                    width: 20.0,
                    height: 10.0,
                },
            )
            .unwrap();
        assert_eq!(rect, Rect::new(20.0, 160.0, 40.0, 20.0));
    }

    #[test]
    fn test_rejects_non_finite() {
        let space = CoordinateSpace::screen();
        let err = space
            .normalize(
                7,
                &RawBox::Xywh {
                    x: f32::NAN,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { page: 7, .. }));
    }

    #[test]
    fn test_rejects_bad_scale() {
        let space = CoordinateSpace::screen().with_scale(0.0);
        let raw = RawBox::Xywh {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        assert!(space.normalize(1, &raw).is_err());
    }

    #[test]
    fn test_raw_box_json_encoding() {
        let raw: RawBox =
            serde_json::from_str(r#"{"kind":"corners","x0":1,"y0":2,"x1":3,"y1":4}"#).unwrap();
        assert_eq!(
            raw,
            RawBox::Corners {
                x0: 1.0,
                y0: 2.0,
                x1: 3.0,
                y1: 4.0
            }
        );
    }
}

//! Axis-aligned bounding boxes and the coordinate mappings between pixel spaces.
//!
//! Boxes serialize as `[x_min, y_min, x_max, y_max]`, the layout every engine
//! protocol and the results file use.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in floating-point pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
}

impl BoundingBox {
    /// Creates a bounding box from corner coordinates.
    ///
    /// Corners may be given in any order; they are normalized so that
    /// `x_min <= x_max` and `y_min <= y_max`.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Creates a box covering a whole `width` x `height` image.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::from_coords(0.0, 0.0, width, height)
    }

    #[inline]
    pub fn x_min(&self) -> f32 {
        self.x_min
    }

    #[inline]
    pub fn y_min(&self) -> f32 {
        self.y_min
    }

    #[inline]
    pub fn x_max(&self) -> f32 {
        self.x_max
    }

    #[inline]
    pub fn y_max(&self) -> f32 {
        self.y_max
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns true if the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Scales both axes independently about the origin.
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::from_coords(
            self.x_min * sx,
            self.y_min * sy,
            self.x_max * sx,
            self.y_max * sy,
        )
    }

    /// Maps the box from a space of size `from` into a space of size `to`.
    ///
    /// Both spaces are assumed to depict the same content at different sampling
    /// densities, so the mapping is a pure per-axis scale with no translation.
    pub fn rescale(&self, from: (f32, f32), to: (f32, f32)) -> Self {
        let (from_w, from_h) = from;
        let (to_w, to_h) = to;
        let sx = if from_w > 0.0 { to_w / from_w } else { 1.0 };
        let sy = if from_h > 0.0 { to_h / from_h } else { 1.0 };
        self.scale(sx, sy)
    }

    /// Shifts the box by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Clamps the box into `[0, width] x [0, height]`.
    pub fn clamp(&self, width: f32, height: f32) -> Self {
        Self {
            x_min: self.x_min.clamp(0.0, width),
            y_min: self.y_min.clamp(0.0, height),
            x_max: self.x_max.clamp(0.0, width),
            y_max: self.y_max.clamp(0.0, height),
        }
    }

    /// Returns the overlapping region of two boxes, if they overlap.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let x_min = self.x_min.max(other.x_min);
        let y_min = self.y_min.max(other.y_min);
        let x_max = self.x_max.min(other.x_max);
        let y_max = self.y_max.min(other.y_max);
        if x_max <= x_min || y_max <= y_min {
            return None;
        }
        Some(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Fraction of this box's area that lies inside `other`.
    ///
    /// Returns 0.0 for empty boxes.
    pub fn intersection_pct(&self, other: &BoundingBox) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection(other)
            .map(|overlap| overlap.area() / area)
            .unwrap_or(0.0)
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Integer crop rectangle `(x, y, width, height)` inside a `width` x `height` image.
    ///
    /// Coordinates are rounded to the nearest pixel and the result always covers
    /// at least one pixel, so a crop taken from it is never empty.
    pub fn pixel_rect(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let max_x = width.saturating_sub(1);
        let max_y = height.saturating_sub(1);
        let x1 = (self.x_min.round().max(0.0) as u32).min(max_x);
        let y1 = (self.y_min.round().max(0.0) as u32).min(max_y);
        let x2 = (self.x_max.round().max(0.0) as u32).clamp(x1 + 1, width.max(x1 + 1));
        let y2 = (self.y_max.round().max(0.0) as u32).clamp(y1 + 1, height.max(y1 + 1));
        (x1, y1, x2 - x1, y2 - y1)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(coords: [f32; 4]) -> Self {
        Self::from_coords(coords[0], coords[1], coords[2], coords[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &BoundingBox, b: &BoundingBox) {
        let a: [f32; 4] = (*a).into();
        let b: [f32; 4] = (*b).into();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-3, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_from_coords_normalizes_corners() {
        let bbox = BoundingBox::from_coords(10.0, 20.0, 5.0, 2.0);
        assert_eq!(bbox.x_min(), 5.0);
        assert_eq!(bbox.y_min(), 2.0);
        assert_eq!(bbox.x_max(), 10.0);
        assert_eq!(bbox.y_max(), 20.0);
    }

    #[test]
    fn test_rescale_is_pure_scale() {
        let bbox = BoundingBox::from_coords(10.0, 20.0, 110.0, 70.0);
        let scaled = bbox.rescale((816.0, 1056.0), (1632.0, 2112.0));
        assert_close(&scaled, &BoundingBox::from_coords(20.0, 40.0, 220.0, 140.0));
    }

    #[test]
    fn test_rescale_round_trip() {
        let working = (813.0, 1051.0);
        let highres = (1627.0, 2103.0);
        let boxes = [
            BoundingBox::from_coords(0.0, 0.0, 813.0, 1051.0),
            BoundingBox::from_coords(12.5, 300.25, 640.75, 777.0),
            BoundingBox::from_coords(401.0, 9.0, 402.0, 10.0),
        ];
        for bbox in boxes {
            let back = bbox.rescale(working, highres).rescale(highres, working);
            assert_close(&back, &bbox);
        }
    }

    #[test]
    fn test_intersection_pct() {
        let line = BoundingBox::from_coords(0.0, 0.0, 10.0, 10.0);
        let table = BoundingBox::from_coords(5.0, 0.0, 20.0, 20.0);
        assert!((line.intersection_pct(&table) - 0.5).abs() < 1e-6);

        let disjoint = BoundingBox::from_coords(50.0, 50.0, 60.0, 60.0);
        assert_eq!(line.intersection_pct(&disjoint), 0.0);
        assert!(line.intersection(&disjoint).is_none());

        let degenerate = BoundingBox::from_coords(1.0, 1.0, 1.0, 5.0);
        assert_eq!(degenerate.intersection_pct(&table), 0.0);
    }

    #[test]
    fn test_clamp_to_image() {
        let bbox = BoundingBox::from_coords(-5.0, 10.0, 120.0, 60.0).clamp(100.0, 50.0);
        assert_close(&bbox, &BoundingBox::from_coords(0.0, 10.0, 100.0, 50.0));
    }

    #[test]
    fn test_union_covers_both() {
        let a = BoundingBox::from_coords(10.0, 5.0, 20.0, 15.0);
        let b = BoundingBox::from_coords(30.0, 4.0, 40.0, 12.0);
        assert_close(&a.union(&b), &BoundingBox::from_coords(10.0, 4.0, 40.0, 15.0));
    }

    #[test]
    fn test_pixel_rect_never_empty() {
        let bbox = BoundingBox::from_coords(10.4, 20.6, 30.5, 40.2);
        assert_eq!(bbox.pixel_rect(100, 100), (10, 21, 21, 19));

        let sliver = BoundingBox::from_coords(99.8, 5.0, 100.0, 5.1);
        let (x, y, w, h) = sliver.pixel_rect(100, 100);
        assert_eq!((x, y), (99, 5));
        assert_eq!((w, h), (1, 1));
    }

    #[test]
    fn test_serializes_as_array() {
        let bbox = BoundingBox::from_coords(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let parsed: BoundingBox = serde_json::from_str("[3, 4, 1, 2]").unwrap();
        assert_eq!(parsed, bbox);
    }
}

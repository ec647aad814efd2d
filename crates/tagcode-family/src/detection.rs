//! Decode results and their image-space geometry.

use crate::Homography;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tagcode_core::SpatialGrid;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Quad geometry measured by the pixel-level detector for one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuadObservation {
    /// Corners in image pixels, in the detector's own winding order.
    pub corners: [Point2<f64>; 4],
    /// Center of the quad in image pixels.
    pub center: Point2<f64>,
    /// Length of the edge chain that closed the quad, in pixels.
    pub observed_perimeter: f64,
    /// Tag-to-image mapping, if the detector fitted one.
    pub homography: Option<Homography>,
}

/// Result of decoding one observed code word.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagDetection {
    /// `hamming_distance <= error_recovery_bits` at decode time.
    pub good: bool,
    /// Bits as sampled from the image, before orientation is resolved.
    pub observed_code: u64,
    /// Reference code of the matched id, unrotated.
    pub matched_code: u64,
    pub id: u32,
    /// Bit errors between the observation and the matched code; lower is better.
    pub hamming_distance: u32,
    /// Quarter turns `0..=3` such that `observed ≈ rotate90^rotation(matched_code)`.
    pub rotation: u8,
    /// Filled in by [`TagDetection::with_quad`]; `decode` leaves it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quad: Option<QuadObservation>,
}

impl TagDetection {
    /// Attach detector geometry, re-oriented by the decoded rotation.
    ///
    /// Corner `i` of the observation becomes corner `(i + rotation) % 4`, so
    /// corner 0 always belongs to the same physical corner of the tag. The
    /// homography is turned to match.
    pub fn with_quad(mut self, quad: QuadObservation) -> Self {
        let r = self.rotation as usize % 4;
        let mut corners = quad.corners;
        for (i, &c) in quad.corners.iter().enumerate() {
            corners[(i + r) % 4] = c;
        }
        let homography = quad
            .homography
            .map(|h| h.rotated_quarter_turns(-(r as i32)));

        self.quad = Some(QuadObservation {
            corners,
            homography,
            ..quad
        });
        self
    }

    /// Corners in image pixels, if geometry is attached.
    pub fn corners(&self) -> Option<&[Point2<f64>; 4]> {
        self.quad.as_ref().map(|q| &q.corners)
    }

    pub fn center(&self) -> Option<Point2<f64>> {
        self.quad.as_ref().map(|q| q.center)
    }

    /// Map a point in tag coordinates (`[-1, 1]²`) to image pixels.
    pub fn interpolate(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.quad.as_ref()?.homography.map(|h| h.apply(p))
    }

    /// Sum of the four corner-to-corner edge lengths.
    fn edge_length_sum(&self) -> Option<f64> {
        let c = self.corners()?;
        Some((0..4).map(|i| (c[(i + 1) % 4] - c[i]).norm()).sum())
    }

    /// `true` when both detections have geometry and their centers are closer
    /// than the mean tag "radius" (1/16 of both quads' edge lengths combined).
    pub fn overlaps(&self, other: &TagDetection) -> bool {
        let (Some(a), Some(b)) = (self.edge_length_sum(), other.edge_length_sum()) else {
            return false;
        };
        let (Some(ca), Some(cb)) = (self.center(), other.center()) else {
            return false;
        };
        (ca - cb).norm() < 0.0625 * (a + b)
    }
}

/// Collapse repeated detections of the same tag.
///
/// Detections are taken in order and compared with every already kept
/// detection of the same id that they overlap. A detection beats a kept
/// one if it has fewer bit errors, or equal errors and a longer observed
/// perimeter. It takes the place of the first kept detection it beats and
/// evicts any other it beats; if it overlaps a kept detection but beats
/// none, it is dropped. Same-id detections that do not overlap are all
/// kept. Detections without geometry never overlap anything.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(detections), fields(n = detections.len())))]
pub fn suppress_duplicates(detections: Vec<TagDetection>) -> Vec<TagDetection> {
    let located: Vec<(Point2<f64>, f64)> = detections
        .iter()
        .filter_map(|d| Some((d.center()?, d.edge_length_sum()?)))
        .collect();
    let Some((mut grid, max_edges)) = kept_index(&located) else {
        return detections;
    };

    let input_len = detections.len();
    // Evicted slots become `None` so grid indices stay valid.
    let mut kept: Vec<Option<TagDetection>> = Vec::with_capacity(input_len);

    for det in detections {
        let geometry = det.center().zip(det.edge_length_sum());
        let Some((center, edges)) = geometry else {
            kept.push(Some(det));
            continue;
        };

        // Overlap needs distance < (edges + other_edges) / 16.
        let range = 0.0625 * (edges + max_edges);
        let mut candidates: Vec<usize> = grid.find(center.x, center.y, range).copied().collect();
        candidates.sort_unstable();

        let mut overlapping = false;
        let mut beaten: Vec<usize> = Vec::new();
        for idx in candidates {
            let Some(other) = kept[idx].as_ref() else {
                continue;
            };
            if other.id != det.id || !det.overlaps(other) {
                continue;
            }
            overlapping = true;
            if beats(&det, other) {
                beaten.push(idx);
            }
        }

        if !overlapping {
            grid.add(center.x, center.y, kept.len());
            kept.push(Some(det));
            continue;
        }

        for &idx in &beaten {
            if let Some(old) = kept[idx].take().and_then(|d| d.center()) {
                grid.remove(old.x, old.y, &idx);
            }
        }
        if let Some(&slot) = beaten.first() {
            grid.add(center.x, center.y, slot);
            kept[slot] = Some(det);
        }
    }

    let kept: Vec<TagDetection> = kept.into_iter().flatten().collect();
    log::debug!("duplicate suppression kept {} of {input_len}", kept.len());
    kept
}

/// Fewer bit errors wins; equal errors fall back to the longer perimeter.
fn beats(det: &TagDetection, other: &TagDetection) -> bool {
    det.hamming_distance < other.hamming_distance
        || (det.hamming_distance == other.hamming_distance && perimeter(det) > perimeter(other))
}

fn perimeter(d: &TagDetection) -> f64 {
    d.quad.as_ref().map_or(0.0, |q| q.observed_perimeter)
}

/// Empty grid over all detection centers plus the largest edge sum.
fn kept_index(located: &[(Point2<f64>, f64)]) -> Option<(SpatialGrid<usize>, f64)> {
    let (first, _) = located.first()?;
    let mut lo = *first;
    let mut hi = *first;
    let mut max_edges = 0.0f64;
    for (c, e) in located {
        lo = Point2::new(lo.x.min(c.x), lo.y.min(c.y));
        hi = Point2::new(hi.x.max(c.x), hi.y.max(c.y));
        max_edges = max_edges.max(*e);
    }
    // At most ~128 cells per side, however spread out the tags are.
    let span = (hi.x - lo.x).max(hi.y - lo.y);
    let cell = (0.125 * max_edges).max(span / 128.0).max(1.0);
    SpatialGrid::new(lo.x, lo.y, hi.x, hi.y, cell)
        .ok()
        .map(|g| (g, max_edges))
}

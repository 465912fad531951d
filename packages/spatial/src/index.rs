//! R-tree over polygon bounding boxes.

use geo::{BoundingRect, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

/// Bounding box of one indexed polygon, keyed by its position in the
/// slice the index was built from.
struct IndexedEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bounding-box index for candidate lookups against a polygon slice.
///
/// The index stores positions only; exact predicates are evaluated by the
/// caller against the original polygons.
pub struct PolygonIndex {
    tree: RTree<IndexedEnvelope>,
}

impl PolygonIndex {
    /// Bulk-loads the envelopes of `polygons`. Empty polygons are skipped.
    #[must_use]
    pub fn build(polygons: &[&MultiPolygon<f64>]) -> Self {
        let entries = polygons
            .iter()
            .enumerate()
            .filter_map(|(index, polygon)| {
                compute_envelope(polygon).map(|envelope| IndexedEnvelope { index, envelope })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Positions of polygons whose envelope intersects `envelope`.
    pub fn candidates(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = usize> {
        self.tree
            .locate_in_envelope_intersecting(envelope)
            .map(|entry| entry.index)
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
///
/// Returns `None` for an empty geometry.
#[must_use]
pub fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

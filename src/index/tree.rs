use crate::RoadNetworkGraph;
use crate::index::{SegmentEntry, SpatialIndex, segment_bounds};

use geo::{Point, Rect};
use measure_time::debug_time;
use rstar::{AABB, RTree};
use std::fmt::{Debug, Formatter};
use trajmatch_geo::DistanceFunction;

/// An R-tree over segment envelopes, bulk-loaded once.
pub struct TreeIndex {
    distance: DistanceFunction,
    bounds: Rect,
    tree: RTree<SegmentEntry>,
    segments: Vec<SegmentEntry>,
    extent: f64,
}

impl Debug for TreeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeIndex with Segments: {}", self.segments.len())
    }
}

impl TreeIndex {
    pub fn build(graph: &RoadNetworkGraph) -> Self {
        debug_time!("build r-tree index");

        let segments = SegmentEntry::collect(graph);
        let bounds = segment_bounds(&segments).unwrap_or_else(|| graph.bounds());

        // Mean of the larger side of each segment envelope.
        let extent = segments
            .iter()
            .map(|segment| {
                let envelope = segment.bounding_rect();
                envelope.width().max(envelope.height())
            })
            .sum::<f64>()
            / segments.len().max(1) as f64;

        TreeIndex {
            distance: graph.distance_fn(),
            bounds,
            tree: RTree::bulk_load(segments.clone()),
            segments,
            extent,
        }
    }
}

impl SpatialIndex for TreeIndex {
    fn distance_fn(&self) -> DistanceFunction {
        self.distance
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn initial_extent(&self) -> f64 {
        self.extent
    }

    fn segments(&self) -> &[SegmentEntry] {
        &self.segments
    }

    fn intersecting(&self, window: &Rect) -> Vec<&SegmentEntry> {
        let envelope = AABB::from_corners(Point::from(window.min()), Point::from(window.max()));

        let mut hits = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .collect::<Vec<_>>();

        hits.sort_by_key(|segment| (segment.way, segment.segment));
        hits
    }
}

//! Spatial indexes over road-way segments.
//!
//! Both [`GridIndex`] and [`TreeIndex`] only need to answer "which segments
//! intersect this rectangle". Range, nearest and k-nearest queries are then
//! provided once by [`SpatialIndex`], so both indexes answer them with the
//! same policy and the same tie-breaking.

pub mod error;
pub mod grid;
pub mod tree;


#[doc(inline)]
pub use error::IndexError;
#[doc(inline)]
pub use grid::GridIndex;
#[doc(inline)]
pub use tree::TreeIndex;

use crate::{ConfigError, IndexConfig, IndexKind, RoadNetworkGraph, WayId};

use geo::{Intersects, Point, Rect, coord};
use rstar::AABB;
use std::collections::{BTreeMap, BTreeSet, btree_map::Entry};
use trajmatch_geo::DistanceFunction;

#[cfg(feature = "tracing")]
use tracing::Level;

/// Factor the search window grows by between expansions.
pub const GROWTH: f64 = 2.0;

/// A single segment of a road way, between two consecutive way nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEntry {
    pub way: WayId,
    pub segment: usize,
    pub source: Point,
    pub target: Point,
}

impl SegmentEntry {
    pub fn bounding_rect(&self) -> Rect {
        Rect::new(self.source.0, self.target.0)
    }

    fn collect(graph: &RoadNetworkGraph) -> Vec<SegmentEntry> {
        graph
            .ways()
            .flat_map(|way| {
                way.segments()
                    .map(move |(segment, source, target)| SegmentEntry {
                        way: way.id,
                        segment,
                        source,
                        target,
                    })
            })
            .collect()
    }
}

impl rstar::RTreeObject for SegmentEntry {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.source, self.target)
    }
}

/// The closest point of a way to some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    pub way: WayId,
    /// Segment of the way the closest point lies on.
    pub segment: usize,
    /// Position along that segment, `0.0` at its source and `1.0` at its target.
    pub fraction: f64,
    pub point: Point,
    /// Metres between the query point and [`Nearest::point`].
    pub distance: f64,
}

/// Projects `point` onto every segment, keeping the closest projection of each
/// way. The result is ordered by distance, then way id.
pub(crate) fn closest_per_way<'a>(
    distance: DistanceFunction,
    point: Point,
    segments: impl IntoIterator<Item = &'a SegmentEntry>,
) -> Vec<Nearest> {
    let mut closest: BTreeMap<WayId, Nearest> = BTreeMap::new();

    for entry in segments {
        let projection = distance.project(point, entry.source, entry.target);
        let nearest = Nearest {
            way: entry.way,
            segment: entry.segment,
            fraction: projection.fraction,
            point: projection.point,
            distance: projection.distance,
        };

        match closest.entry(entry.way) {
            Entry::Vacant(vacant) => {
                vacant.insert(nearest);
            }
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if nearest.distance < current.distance
                    || (nearest.distance == current.distance && nearest.segment < current.segment)
                {
                    occupied.insert(nearest);
                }
            }
        }
    }

    let mut found = closest.into_values().collect::<Vec<_>>();
    found.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.way.cmp(&b.way)));
    found
}

/// Bounding rectangle of every segment, or `None` without any.
pub(crate) fn segment_bounds(segments: &[SegmentEntry]) -> Option<Rect> {
    segments
        .iter()
        .map(SegmentEntry::bounding_rect)
        .reduce(|a, b| {
            Rect::new(
                coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}

fn square(point: Point, extent: f64) -> Rect {
    Rect::new(
        coord! { x: point.x() - extent, y: point.y() - extent },
        coord! { x: point.x() + extent, y: point.y() + extent },
    )
}

fn covers(window: &Rect, bounds: &Rect) -> bool {
    window.min().x <= bounds.min().x
        && window.min().y <= bounds.min().y
        && window.max().x >= bounds.max().x
        && window.max().y >= bounds.max().y
}

pub trait SpatialIndex: Send + Sync {
    fn distance_fn(&self) -> DistanceFunction;

    /// Bounding rectangle of every indexed segment.
    fn bounds(&self) -> Rect;

    /// Half-extent, in coordinate units, of the first window an expanding
    /// search looks in.
    fn initial_extent(&self) -> f64;

    /// Every indexed segment.
    fn segments(&self) -> &[SegmentEntry];

    /// Segments whose envelope may intersect `window`. May over-report, but
    /// must never miss a segment that does intersect it.
    fn intersecting(&self, window: &Rect) -> Vec<&SegmentEntry>;

    fn len(&self) -> usize {
        self.segments().len()
    }

    fn is_empty(&self) -> bool {
        self.segments().is_empty()
    }

    /// The closest point of every way within `radius` metres of `point`,
    /// ordered by distance then way id.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::TRACE, skip(self)))]
    fn within(&self, point: Point, radius: f64) -> Vec<Nearest> {
        let window = self.distance_fn().envelope(point, radius);
        if !window.intersects(&self.bounds()) {
            return vec![];
        }

        let mut found = closest_per_way(self.distance_fn(), point, self.intersecting(&window));
        found.retain(|nearest| nearest.distance <= radius);
        found
    }

    /// Ways with at least one segment within `radius` metres of `point`.
    fn range_query(&self, point: Point, radius: f64) -> BTreeSet<WayId> {
        self.within(point, radius)
            .into_iter()
            .map(|nearest| nearest.way)
            .collect()
    }

    /// The closest way to `point`, ties going to the lowest way id.
    fn nearest_neighbor(&self, point: Point) -> Option<Nearest> {
        self.expand(point, 1).into_iter().next()
    }

    /// The `k` closest ways to `point`.
    fn k_nearest(&self, point: Point, k: usize) -> Result<Vec<Nearest>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }

        if !self.bounds().intersects(&point) {
            return Ok(vec![]);
        }

        let mut found = self.expand(point, k);
        if found.len() < k {
            return Err(IndexError::Capacity {
                requested: k,
                available: found.len(),
            });
        }

        found.truncate(k);
        Ok(found)
    }

    /// Expanding-ring search.
    ///
    /// Starting from [`initial_extent`](Self::initial_extent), the window grows
    /// by [`GROWTH`] until it holds at least `k` ways, then grows exactly once
    /// more so that ways just outside the satisfying window, yet closer than
    /// what it found, are still considered. Stops early once the window covers
    /// the whole index.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::TRACE, skip(self)))]
    fn expand(&self, point: Point, k: usize) -> Vec<Nearest> {
        let bounds = self.bounds();
        if self.is_empty() || !bounds.intersects(&point) {
            return vec![];
        }

        let mut extent = self.initial_extent();
        if !(extent.is_finite() && extent > 0.0) {
            extent = bounds.width().max(bounds.height()).max(f64::EPSILON);
        }

        let mut satisfied = false;
        loop {
            let window = square(point, extent);
            let found = closest_per_way(self.distance_fn(), point, self.intersecting(&window));

            if satisfied || covers(&window, &bounds) {
                return found;
            }

            satisfied = found.len() >= k;
            extent *= GROWTH;
        }
    }
}

/// The index a matcher queries, chosen by [`IndexConfig::kind`].
#[derive(Debug)]
pub enum RoadNetworkIndex {
    Grid(GridIndex),
    Tree(TreeIndex),
}

impl RoadNetworkIndex {
    pub fn build(graph: &RoadNetworkGraph, config: &IndexConfig) -> Result<Self, ConfigError> {
        if config.cell_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "index.cell_capacity",
            });
        }

        Ok(match config.kind {
            IndexKind::Grid => RoadNetworkIndex::Grid(GridIndex::build(
                graph,
                config.cell_capacity,
                config.replicate_boundary,
            )),
            IndexKind::RTree => RoadNetworkIndex::Tree(TreeIndex::build(graph)),
        })
    }

    fn inner(&self) -> &dyn SpatialIndex {
        match self {
            RoadNetworkIndex::Grid(grid) => grid,
            RoadNetworkIndex::Tree(tree) => tree,
        }
    }
}

impl SpatialIndex for RoadNetworkIndex {
    fn distance_fn(&self) -> DistanceFunction {
        self.inner().distance_fn()
    }

    fn bounds(&self) -> Rect {
        self.inner().bounds()
    }

    fn initial_extent(&self) -> f64 {
        self.inner().initial_extent()
    }

    fn segments(&self) -> &[SegmentEntry] {
        self.inner().segments()
    }

    fn intersecting(&self, window: &Rect) -> Vec<&SegmentEntry> {
        self.inner().intersecting(window)
    }
}

use crate::RoadNetworkGraph;
use crate::index::{SegmentEntry, SpatialIndex, segment_bounds};

use geo::{Intersects, Rect, coord};
use log::debug;
use measure_time::debug_time;
use std::ops::RangeInclusive;
use trajmatch_geo::DistanceFunction;

/// A uniform grid of cells over the network bounds.
///
/// The number of cells is chosen so each holds about `cell_capacity` segments
/// on average, with the columns-to-rows ratio following the aspect ratio of
/// the bounds.
#[derive(Debug)]
pub struct GridIndex {
    distance: DistanceFunction,
    bounds: Rect,
    columns: usize,
    rows: usize,
    cell_width: f64,
    cell_height: f64,
    cells: Vec<Vec<u32>>,
    segments: Vec<SegmentEntry>,
    replicate_boundary: bool,
    /// Largest half-width and half-height of any segment envelope. Only used
    /// when segments are registered in their midpoint cell alone.
    margin: (f64, f64),
}

impl GridIndex {
    pub fn build(graph: &RoadNetworkGraph, cell_capacity: usize, replicate_boundary: bool) -> Self {
        debug_time!("build grid index");

        let segments = SegmentEntry::collect(graph);
        let bounds = segment_bounds(&segments).unwrap_or_else(|| graph.bounds());

        let span = bounds.width().max(bounds.height());
        let extent = |length: f64| match length {
            length if length > 0.0 => length,
            _ if span > 0.0 => span,
            _ => 1.0,
        };
        let (width, height) = (extent(bounds.width()), extent(bounds.height()));

        let cells = segments.len().div_ceil(cell_capacity.max(1)).max(1);
        let columns = ((cells as f64 * width / height).sqrt().round() as usize).clamp(1, cells);
        let rows = cells.div_ceil(columns).max(1);

        let mut grid = GridIndex {
            distance: graph.distance_fn(),
            bounds,
            columns,
            rows,
            cell_width: width / columns as f64,
            cell_height: height / rows as f64,
            cells: vec![vec![]; columns * rows],
            segments: vec![],
            replicate_boundary,
            margin: (0.0, 0.0),
        };

        for (index, segment) in segments.iter().enumerate() {
            let envelope = segment.bounding_rect();

            if replicate_boundary {
                if let Some((columns, rows)) = grid.span(&envelope) {
                    for row in rows {
                        for column in columns.clone() {
                            grid.cells[row * grid.columns + column].push(index as u32);
                        }
                    }
                }
            } else {
                let centre = envelope.center();
                let cell = grid.row(centre.y) * grid.columns + grid.column(centre.x);
                grid.cells[cell].push(index as u32);

                grid.margin.0 = grid.margin.0.max(envelope.width() / 2.0);
                grid.margin.1 = grid.margin.1.max(envelope.height() / 2.0);
            }
        }

        debug!(
            "Grid index of {} segments over {}x{} cells (replicated: {})",
            segments.len(),
            columns,
            rows,
            replicate_boundary
        );

        grid.segments = segments;
        grid
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    /// Number of segments registered in the cell at `(column, row)`.
    pub fn occupancy(&self, column: usize, row: usize) -> usize {
        self.cells
            .get(row * self.columns + column)
            .map_or(0, Vec::len)
    }

    #[inline]
    fn column(&self, x: f64) -> usize {
        let offset = ((x - self.bounds.min().x) / self.cell_width).floor().max(0.0);
        (offset as usize).min(self.columns - 1)
    }

    #[inline]
    fn row(&self, y: f64) -> usize {
        let offset = ((y - self.bounds.min().y) / self.cell_height).floor().max(0.0);
        (offset as usize).min(self.rows - 1)
    }

    /// The columns and rows of the cells overlapping `window`.
    fn span(&self, window: &Rect) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        if !window.intersects(&self.bounds) {
            return None;
        }

        Some((
            self.column(window.min().x)..=self.column(window.max().x),
            self.row(window.min().y)..=self.row(window.max().y),
        ))
    }
}

impl SpatialIndex for GridIndex {
    fn distance_fn(&self) -> DistanceFunction {
        self.distance
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn initial_extent(&self) -> f64 {
        self.cell_width.max(self.cell_height)
    }

    fn segments(&self) -> &[SegmentEntry] {
        &self.segments
    }

    fn intersecting(&self, window: &Rect) -> Vec<&SegmentEntry> {
        let widened = if self.replicate_boundary {
            *window
        } else {
            let (dx, dy) = self.margin;
            Rect::new(
                coord! { x: window.min().x - dx, y: window.min().y - dy },
                coord! { x: window.max().x + dx, y: window.max().y + dy },
            )
        };

        let Some((columns, rows)) = self.span(&widened) else {
            return vec![];
        };

        let mut hits = vec![];
        for row in rows {
            for column in columns.clone() {
                hits.extend_from_slice(&self.cells[row * self.columns + column]);
            }
        }

        hits.sort_unstable();
        hits.dedup();

        hits.into_iter()
            .map(|index| &self.segments[index as usize])
            .filter(|segment| segment.bounding_rect().intersects(window))
            .collect()
    }
}

//! Point-to-segment projection.

use crate::DistanceFunction;
use geo::Point;

/// The closest point of a segment to some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// The projected position, always on the segment.
    pub point: Point,
    /// Position along the segment, `0.0` at its source and `1.0` at its target.
    pub fraction: f64,
    /// Metric distance from the query point to [`Projection::point`].
    pub distance: f64,
}

impl DistanceFunction {
    /// Projects `point` onto the segment `source -> target`, clamping to
    /// the segment endpoints.
    ///
    /// Great-circle segments are projected in a local equirectangular frame
    /// centred at the query latitude. The returned projection is never
    /// further from `point` than either endpoint.
    ///
    /// ```rust
    /// use geo::Point;
    /// use trajmatch_geo::DistanceFunction;
    ///
    /// let projection = DistanceFunction::Euclidean.project(
    ///     Point::new(5.0, 3.0),
    ///     Point::new(0.0, 0.0),
    ///     Point::new(10.0, 0.0),
    /// );
    ///
    /// assert_eq!(projection.point, Point::new(5.0, 0.0));
    /// assert_eq!(projection.distance, 3.0);
    /// ```
    pub fn project(&self, point: Point, source: Point, target: Point) -> Projection {
        let scale = match self {
            DistanceFunction::Euclidean => 1.0,
            DistanceFunction::GreatCircle => point.y().to_radians().cos().abs().max(f64::EPSILON),
        };

        let (dx, dy) = ((target.x() - source.x()) * scale, target.y() - source.y());
        let (px, py) = ((point.x() - source.x()) * scale, point.y() - source.y());

        let squared = dx * dx + dy * dy;
        let fraction = if squared > 0.0 {
            ((px * dx + py * dy) / squared).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let projected = Point::new(
            source.x() + (target.x() - source.x()) * fraction,
            source.y() + (target.y() - source.y()) * fraction,
        );

        let candidate = Projection {
            point: projected,
            fraction,
            distance: self.distance(point, projected),
        };

        let to_source = self.distance(point, source);
        let to_target = self.distance(point, target);

        if to_source < candidate.distance && to_source <= to_target {
            Projection {
                point: source,
                fraction: 0.0,
                distance: to_source,
            }
        } else if to_target < candidate.distance {
            Projection {
                point: target,
                fraction: 1.0,
                distance: to_target,
            }
        } else {
            candidate
        }
    }
}

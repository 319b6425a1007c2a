use geo::{Destination, Distance, Euclidean, Haversine, Point, Rect, coord};
use serde::{Deserialize, Serialize};

/// The metric a road network and its trajectories are measured in.
///
/// All distances returned are in metres. In [`DistanceFunction::Euclidean`]
/// mode, coordinates are assumed to already be metres on a plane. In
/// [`DistanceFunction::GreatCircle`] mode they are longitude/latitude degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    Euclidean,
    #[default]
    GreatCircle,
}

impl DistanceFunction {
    /// Distance, in metres, between two points.
    #[inline]
    pub fn distance(&self, a: Point, b: Point) -> f64 {
        match self {
            DistanceFunction::Euclidean => Euclidean.distance(a, b),
            DistanceFunction::GreatCircle => Haversine.distance(a, b),
        }
    }

    /// Total length, in metres, of the polyline described by `points`.
    pub fn length(&self, points: &[Point]) -> f64 {
        points
            .windows(2)
            .map(|pair| self.distance(pair[0], pair[1]))
            .sum()
    }

    /// The axis-aligned rectangle, in coordinate units, enclosing every point
    /// within `radius` metres of `origin`.
    ///
    /// In great-circle mode the rectangle is obtained by travelling `radius`
    /// metres along the four cardinal bearings, which over-covers the circle
    /// slightly away from the equator.
    pub fn envelope(&self, origin: Point, radius: f64) -> Rect {
        match self {
            DistanceFunction::Euclidean => Rect::new(
                coord! { x: origin.x() - radius, y: origin.y() - radius },
                coord! { x: origin.x() + radius, y: origin.y() + radius },
            ),
            DistanceFunction::GreatCircle => {
                let north = Haversine.destination(origin, 0.0, radius);
                let east = Haversine.destination(origin, 90.0, radius);
                let south = Haversine.destination(origin, 180.0, radius);
                let west = Haversine.destination(origin, 270.0, radius);

                // The east/west destinations drift toward the equator, so the
                // widest longitude is taken against the origin latitude.
                let half_width = (east.x() - origin.x()).abs().max((origin.x() - west.x()).abs());

                Rect::new(
                    coord! { x: origin.x() - half_width, y: south.y() },
                    coord! { x: origin.x() + half_width, y: north.y() },
                )
            }
        }
    }

    /// Converts a metric radius around `origin` into the largest half-extent,
    /// in coordinate units, of its [`envelope`](Self::envelope).
    pub fn extent(&self, origin: Point, radius: f64) -> f64 {
        let envelope = self.envelope(origin, radius);
        (envelope.width() / 2.0).max(envelope.height() / 2.0)
    }
}

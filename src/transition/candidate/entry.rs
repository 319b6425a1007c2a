use crate::WayId;
use geo::Point;

/// A possible road position for one sample.
///
/// Only the closest position along each way is ever proposed, so a way
/// contributes at most one candidate per sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub way: WayId,
    /// Segment of the way the candidate lies on.
    pub segment: usize,
    /// The sample projected onto the way.
    pub position: Point,
    /// Metres from the first node of the way.
    pub offset: f64,
    /// Metres between the sample and [`Candidate::position`].
    pub distance: f64,
}

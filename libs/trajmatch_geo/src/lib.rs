//! Geometry primitives shared by the matcher.
//!
//! Every metric computation in `trajmatch` goes through a [`DistanceFunction`],
//! so that a road network and its trajectories can be expressed either in planar
//! metres or in WGS84 longitude/latitude degrees.

pub const MEAN_EARTH_RADIUS: f64 = 6371008.8;

pub mod distance;
pub mod project;


#[doc(inline)]
pub use distance::DistanceFunction;
#[doc(inline)]
pub use project::Projection;

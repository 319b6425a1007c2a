//! The road network a trajectory is matched onto.

pub mod builder;
pub mod error;
pub mod item;
pub mod network;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use builder::GraphBuilder;
#[doc(inline)]
pub use error::GraphError;
#[doc(inline)]
pub use item::*;
#[doc(inline)]
pub use network::RoadNetworkGraph;

pub mod dijkstra;
pub mod error;
pub mod reach;

#[cfg(test)]
mod test;

pub use dijkstra::*;
pub use error::*;
pub use reach::*;

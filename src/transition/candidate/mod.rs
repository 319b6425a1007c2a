pub mod entry;
pub mod generator;


pub use entry::*;
pub use generator::*;

pub mod builder;
pub mod entity;

pub use builder::*;
pub use entity::*;

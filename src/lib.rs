#![doc = include_str!("../README.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod matching;
pub mod schedule;
pub mod trajectory;
pub mod transition;

#[cfg(test)]
pub(crate) mod fixture;

#[doc(inline)]
pub use config::*;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use graph::*;
#[doc(inline)]
pub use index::*;
#[doc(inline)]
pub use matching::*;
#[doc(inline)]
pub use schedule::*;
#[doc(inline)]
pub use trajectory::*;

pub use trajmatch_geo::{DistanceFunction, Projection};

//! Whole-trajectory map matching.
//!
//! [`MapMatchingAlgorithm`] is the capability every matcher offers, and
//! [`HmmMatcher`] implements it with the hidden Markov model of the
//! [`transition`](crate::transition) module.

pub mod definition;
pub mod hmm;
pub mod result;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use definition::*;
#[doc(inline)]
pub use hmm::*;
#[doc(inline)]
pub use result::*;

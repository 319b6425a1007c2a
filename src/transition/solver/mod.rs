pub mod methods;
pub mod online;
pub mod viterbi;


pub use methods::*;
pub use online::*;
pub use viterbi::*;

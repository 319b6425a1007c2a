use crate::{ConfigError, GraphError, IndexError, transition::MatchError};
use thiserror::Error;

/// Any failure surfaced by the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid road network: {0}")]
    Graph(#[from] GraphError),

    #[error("spatial index query failed: {0}")]
    Index(#[from] IndexError),

    #[error("could not match trajectory: {0}")]
    Match(#[from] MatchError),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("k must be at least 1")]
    InvalidK,

    #[error("requested {requested} nearest ways, but only {available} are reachable")]
    Capacity { requested: usize, available: usize },
}

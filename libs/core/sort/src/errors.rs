use thiserror::Error;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was stopped by cooperative cancellation before it
    /// could complete.
    #[error("cancelled")]
    Cancelled,

    /// Two records shared a key and the caller's combine function
    /// rejected merging them.
    #[error("duplicate key could not be merged: {0}")]
    UnmergeableDuplicate(String),
}

//! The external sorter (chunk, spill, k-way merge) and the cooperative
//! cancellation token used by every sorting stage of the pipeline.

pub mod cancellation;
pub mod errors;
pub mod external_sort;
pub mod merger;

pub use cancellation::{CancellationToken, PollGuard};
pub use errors::SortError;
pub use external_sort::ExternalSorter;
pub use merger::{BufLineSource, KWayMerger, LineSource};

//! Reshaping paths from the merged table to method-specific inputs.
//!
//! Three independent pure transformations: the hierarchical wide pivot,
//! the regression feature table, and the saturating-growth target.

mod hierarchy;
mod regressors;

pub use hierarchy::{HierarchyTable, SeriesKey};
pub use regressors::{build_frames, market_volume_shares, ProductFrame};

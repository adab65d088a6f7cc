//! Components of the root slice. File paths under `actions/` and `jobs/`
//! are the component keys.

pub mod actions;
pub mod jobs;
pub mod providers;
pub mod slices;

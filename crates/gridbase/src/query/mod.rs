//! Query engines: pure functions over decoded snapshots.
//!
//! Filtering, sorting, grouping and calculation never touch the CRDT; the
//! operations layer reads snapshots, runs these, and writes back only
//! what changed.

pub mod calculation;
pub mod filter;
pub mod group;
pub mod numeric;
pub mod sort;

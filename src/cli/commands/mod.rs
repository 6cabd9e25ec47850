//! Command implementations.

pub mod backup;
pub mod check;
pub mod completions;
pub mod sync;
pub mod version;

pub mod traits;

// Snapshot sources
pub mod json_snapshot;

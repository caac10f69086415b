//! Identity, structural diffing and reachability for scene objects.

pub mod context;
pub mod diff;
pub mod reachability;
pub mod registry;
pub mod snapshot;
pub mod transform_log;

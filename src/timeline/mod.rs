//! Recorded keyframes and time seeking.

pub mod store;

//! Minimal scene model: objects, animations, and the programs that record them.

pub mod animation;
pub mod ease;
pub mod graph;
pub mod object;
pub mod program;
pub mod script;

pub mod frame_service;
pub mod protocol;
pub mod renderer;
pub mod server;
pub mod watcher;

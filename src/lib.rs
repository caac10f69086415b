#![forbid(unsafe_code)]
//! Live-preview synchronization between a re-executable scene program and external renderers.
//!
//! A scene program is recorded into a timeline of keyframes. Renderers seek into that timeline and
//! receive only what changed since their last request: removed ids, added objects and in-place
//! updates, plus tween data for animations they can interpolate themselves.

pub mod config;
mod foundation;
pub mod scene;
pub mod service;
pub mod sync;
pub mod timeline;

pub use config::{LoggingConfig, ServeOpts, init_logging};
pub use foundation::core::{ObjectId, ObjectKey, POSITION_TOLERANCE, Rgba, Vec3};
pub use foundation::error::{SyncError, SyncResult};
pub use scene::program::{ProgramSource, RecordedScene, SceneBuilder, SceneOpts, SceneSource};
pub use scene::script::ScriptSource;
pub use service::frame_service::{
    FrameService, ReloadOutcome, ServiceOpts, ServiceStatus, ServingHandle,
};
pub use service::protocol::{FrameRequest, FrameResponse, SceneData};
pub use service::renderer::{RendererLauncher, RendererLink, TcpRendererLink};
pub use service::server::RpcServer;
pub use service::watcher::SceneWatcher;
pub use sync::diff::Diff;
pub use sync::snapshot::{Snapshot, UNKNOWN_MOBJECT};
pub use timeline::store::TimelineStore;

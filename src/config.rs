//! Server configuration and logging setup.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::core::Rgba;
use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::program::SceneOpts;
use crate::service::frame_service::ServiceOpts;
use crate::service::renderer::{RendererLauncher, TcpRendererLink};
use crate::sync::snapshot::CaptureOpts;

/// Everything `framesync serve` needs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeOpts {
    /// Address the frame server listens on.
    pub frame_server_addr: String,

    /// Address a running renderer listens on.
    pub renderer_addr: String,

    /// Renderer executable launched when none is listening.
    pub renderer_path: Option<PathBuf>,

    /// Arguments passed to the renderer executable.
    pub renderer_args: Vec<String>,

    /// Root that image paths are reported relative to.
    pub assets_dir: PathBuf,

    /// RPC worker threads.
    pub workers: usize,

    /// Classes whose children are not tracked individually.
    pub leaf_classes: BTreeSet<String>,

    /// Tag inserted into copy names.
    pub copy_tag: String,

    /// Background reported when the scene sets none.
    pub default_background: Rgba,

    /// Connect timeout when notifying the renderer.
    pub notify_timeout_ms: u64,

    /// Window in which file events are coalesced into one reload.
    pub debounce_ms: u64,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "framesync=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ServeOpts {
    fn default() -> Self {
        Self {
            frame_server_addr: "127.0.0.1:50051".to_owned(),
            renderer_addr: "127.0.0.1:50052".to_owned(),
            renderer_path: None,
            renderer_args: Vec::new(),
            assets_dir: PathBuf::from("assets"),
            workers: 10,
            leaf_classes: CaptureOpts::default().leaf_classes,
            copy_tag: "c".to_owned(),
            default_background: Rgba::BLACK,
            notify_timeout_ms: 50,
            debounce_ms: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl ServeOpts {
    /// Read options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let opts: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject option combinations the server cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.workers == 0 {
            return Err(SyncError::validation("'workers' must be >= 1"));
        }
        if self.copy_tag.is_empty() {
            return Err(SyncError::validation("'copy_tag' must not be empty"));
        }
        if self.notify_timeout_ms == 0 {
            return Err(SyncError::validation("'notify_timeout_ms' must be >= 1"));
        }
        Ok(())
    }

    /// Options for the frame service.
    pub fn service_opts(&self) -> ServiceOpts {
        ServiceOpts {
            scene: SceneOpts {
                capture: CaptureOpts {
                    leaf_classes: self.leaf_classes.clone(),
                },
                copy_tag: self.copy_tag.clone(),
            },
            assets_dir: self.assets_dir.clone(),
            default_background: self.default_background,
        }
    }

    /// Link to the configured renderer address.
    pub fn renderer_link(&self) -> TcpRendererLink {
        TcpRendererLink::new(
            self.renderer_addr.clone(),
            Duration::from_millis(self.notify_timeout_ms),
        )
    }

    /// Launcher for the configured renderer executable, if any.
    pub fn launcher(&self) -> Option<RendererLauncher> {
        self.renderer_path
            .as_ref()
            .map(|p| RendererLauncher::new(p.clone(), self.renderer_args.clone()))
    }

    /// Debounce window for file events.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the configured level.
///
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

use std::io::Write as _;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crate::foundation::error::{SyncError, SyncResult};
use crate::service::protocol::{RendererMessage, SceneData};

/// Push channel to a running renderer.
pub trait RendererLink: Send + Sync {
    /// Tell the renderer the scene changed. Fails fast when no renderer is listening.
    fn notify(&self, data: &SceneData) -> SyncResult<()>;

    /// Where the renderer is expected, for log messages.
    fn endpoint(&self) -> String;
}

/// Renderer reachable over TCP, spoken to in JSON lines.
#[derive(Clone, Debug)]
pub struct TcpRendererLink {
    addr: String,
    timeout: Duration,
}

impl TcpRendererLink {
    /// Link to `addr`, giving up on connects that take longer than `timeout`.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    fn resolve(&self) -> SyncResult<SocketAddr> {
        self.addr
            .to_socket_addrs()
            .map_err(|e| SyncError::renderer(format!("cannot resolve {}: {e}", self.addr)))?
            .next()
            .ok_or_else(|| SyncError::renderer(format!("{} resolved to no address", self.addr)))
    }
}

impl RendererLink for TcpRendererLink {
    fn notify(&self, data: &SceneData) -> SyncResult<()> {
        let addr = self.resolve()?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| SyncError::renderer(format!("no renderer at {addr}: {e}")))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| SyncError::renderer(format!("configuring stream to {addr}: {e}")))?;

        let mut line = serde_json::to_vec(&RendererMessage::UpdateSceneData(data.clone()))?;
        line.push(b'\n');
        stream
            .write_all(&line)
            .and_then(|()| stream.flush())
            .map_err(|e| SyncError::renderer(format!("writing to renderer at {addr}: {e}")))?;
        tracing::debug!(%addr, "renderer notified");
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.addr.clone()
    }
}

/// Starts a renderer process when none is listening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl RendererLauncher {
    /// Launch `program` with `args`.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Executable to launch.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Spawn the renderer detached from our stdio. The renderer fetches the scene itself once up.
    pub fn spawn(&self) -> SyncResult<Child> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                SyncError::renderer(format!(
                    "failed to launch renderer '{}': {e}",
                    self.program.display()
                ))
            })?;
        tracing::info!(program = %self.program.display(), pid = child.id(), "renderer launched");
        Ok(child)
    }
}

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::foundation::error::{SyncError, SyncResult};
use crate::service::frame_service::FrameService;
use crate::service::protocol::{RpcReply, RpcRequest};

const ACCEPT_POLL: Duration = Duration::from_millis(25);

/// JSON-lines RPC front end of a [`FrameService`].
///
/// Each accepted connection is handled on a worker of a fixed-size rayon pool and may carry any
/// number of requests, one JSON object per line, each answered by one line.
pub struct RpcServer {
    listener: TcpListener,
    pool: rayon::ThreadPool,
    service: Arc<FrameService>,
    shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("addr", &self.listener.local_addr().ok())
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

/// Stops a running [`RpcServer`] from another thread.
#[derive(Clone, Debug)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Ask the accept loop to exit.
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl RpcServer {
    /// Bind `addr` and prepare a pool of `workers` threads.
    pub fn bind(addr: &str, workers: usize, service: Arc<FrameService>) -> SyncResult<Self> {
        if workers == 0 {
            return Err(SyncError::validation("server 'workers' must be >= 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("framesync-rpc-{i}"))
            .build()
            .map_err(|e| {
                SyncError::Other(anyhow::anyhow!("failed to build rpc thread pool: {e}"))
            })?;
        let listener = TcpListener::bind(addr).map_err(|e| {
            SyncError::Other(anyhow::Error::new(e).context(format!("binding {addr}")))
        })?;
        Ok(Self {
            listener,
            pool,
            service,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> SyncResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| SyncError::Other(anyhow::Error::new(e).context("reading local address")))
    }

    /// Handle for stopping [`RpcServer::run`].
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Accept connections until shut down or until the service stops accepting.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn run(&self) -> SyncResult<()> {
        self.listener.set_nonblocking(true).map_err(|e| {
            SyncError::Other(anyhow::Error::new(e).context("configuring listener"))
        })?;
        tracing::info!(addr = ?self.listener.local_addr().ok(), "frame server listening");

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::info!("shutdown requested");
                break;
            }
            if !self.service.is_accepting() {
                tracing::info!("service stopped accepting connections");
                break;
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let service = Arc::clone(&self.service);
                    self.pool.spawn(move || {
                        if let Err(e) = serve_connection(stream, &service) {
                            tracing::debug!(%peer, error = %e, "connection closed with error");
                        }
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(ACCEPT_POLL),
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
        Ok(())
    }
}

fn serve_connection(stream: TcpStream, service: &FrameService) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    let mut writer = stream.try_clone()?;
    for line in BufReader::new(stream).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(service, &line);
        let mut out = serde_json::to_vec(&reply).map_err(std::io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out)?;
        writer.flush()?;
    }
    Ok(())
}

/// Decode one request line and run it against `service`.
pub fn handle_line(service: &FrameService, line: &str) -> RpcReply {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return RpcReply::Error {
                message: SyncError::protocol(format!("malformed request: {e}")).to_string(),
            };
        }
    };
    match request {
        RpcRequest::FetchSceneData => RpcReply::Scene(service.fetch_scene_data()),
        RpcRequest::GetFrameAtTime(req) => match service.get_frame_at_time(req) {
            Ok(frame) => RpcReply::Frame(frame),
            Err(e) => RpcReply::Error {
                message: e.to_string(),
            },
        },
    }
}

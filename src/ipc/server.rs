//! Unix domain socket server for IPC
//!
//! Provides request-response communication, and pushes mission events to
//! connections that have subscribed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::{ControlInput, MissionEvent};
use crate::state::MissionSnapshot;

use super::protocol::{MissionStatus, Notification, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with every client handler
struct Shared {
    view: RwLock<ServerView>,
    input_tx: mpsc::Sender<ControlInput>,
    event_tx: broadcast::Sender<MissionEvent>,
}

/// Server's copy of what mission control last published
struct ServerView {
    snapshot: MissionSnapshot,
    start_time: std::time::Instant,
}

impl Server {
    /// Create a new IPC server
    ///
    /// Requests that carry an input are queued on `input_tx`; subscribers
    /// receive whatever is sent on `event_tx`.
    pub fn new(
        socket_path: &Path,
        input_tx: mpsc::Sender<ControlInput>,
        event_tx: broadcast::Sender<MissionEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let shared = Arc::new(Shared {
            view: RwLock::new(ServerView {
                snapshot: MissionSnapshot::default(),
                start_time: std::time::Instant::now(),
            }),
            input_tx,
            event_tx,
        });

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shared,
            shutdown_tx,
        })
    }

    /// Update the snapshot served to status requests
    pub async fn set_snapshot(&self, snapshot: MissionSnapshot) {
        let mut view = self.shared.view.write().await;
        if view.snapshot.state != snapshot.state {
            debug!(
                from = %view.snapshot.state,
                to = %snapshot.state,
                "IPC server: mission state updated"
            );
        }
        view.snapshot = snapshot;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(mut stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        loop {
            let msg_buf = match read_message(&mut stream).await? {
                Some(buf) => buf,
                None => {
                    debug!("client disconnected");
                    return Ok(());
                }
            };

            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    warn!(?e, "malformed request");
                    let response = Response::error("bad_request", e.to_string());
                    send_message(&mut stream, &response).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            if request == Request::Subscribe {
                // Subscribe before confirming so no event slips in between
                let event_rx = shared.event_tx.subscribe();
                send_message(&mut stream, &Response::Subscribed).await?;
                debug!("client subscribed to notifications");
                return Self::forward_events(stream, event_rx).await;
            }

            let response = Self::process_request(request, &shared).await;
            send_message(&mut stream, &response).await?;
        }
    }

    /// Push mission events to a subscribed client until it goes away
    async fn forward_events(
        mut stream: UnixStream,
        mut event_rx: broadcast::Receiver<MissionEvent>,
    ) -> Result<()> {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let notification = Notification::Event { event };
                    if let Err(e) = send_message(&mut stream, &notification).await {
                        debug!(?e, "subscriber went away");
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let view = shared.view.read().await;
                Response::Status(MissionStatus::from_snapshot(
                    view.snapshot.clone(),
                    view.start_time.elapsed().as_secs(),
                ))
            }

            request => match request.into_input() {
                Some(input) => match shared.input_tx.send(input).await {
                    Ok(()) => Response::Accepted,
                    Err(_) => Response::error("unavailable", "mission control is not running"),
                },
                None => Response::error("bad_request", "unsupported request"),
            },
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read one length-prefixed message; `None` on clean disconnect
async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        anyhow::bail!("message too large ({} bytes)", len);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

//! TCP server for zap-server client connections.
//!
//! Each accepted connection gets one worker task. The worker runs the
//! handshake, then answers every `Command` frame with exactly one `Reply`
//! frame, one request at a time. Commands themselves run on the blocking
//! pool since adapters drive external clients synchronously.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::auth;
use crate::protocol::*;
use crate::session::SessionManager;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
/// Handshake frames are tiny JSON objects.
const HANDSHAKE_MAX_PAYLOAD: u32 = 4096;

/// Per-server settings fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared secret every client must prove before sending commands.
    pub auth_key: String,
    pub max_frame_bytes: u32,
    /// Sessions idle this long are closed. `None` keeps them until `Quit`.
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn new(auth_key: impl Into<String>) -> Self {
        Self {
            auth_key: auth_key.into(),
            max_frame_bytes: MAX_PAYLOAD_SIZE,
            idle_timeout: None,
        }
    }
}

/// Bind the listening socket. Fails before any connection is accepted.
pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Accept connections on `listener` until `cancel` fires.
///
/// After the accept loop stops, workers finish their current command and
/// exit; once all are joined every remaining session is closed.
pub async fn serve(
    listener: TcpListener,
    manager: Arc<SessionManager>,
    config: ServerConfig,
    cancel: CancellationToken,
) -> io::Result<()> {
    let config = Arc::new(config);
    let tracker = TaskTracker::new();

    tracing::info!(
        addr = %listener.local_addr()?,
        adapter = %manager.adapter_kind(),
        "zap server listening"
    );

    if let Some(max_idle) = config.idle_timeout {
        tracker.spawn(reap_idle_sessions(manager.clone(), max_idle, cancel.clone()));
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("server received cancel signal, stopping accept loop");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let manager = manager.clone();
                        let config = config.clone();
                        let cancel = cancel.clone();
                        tracker.spawn(async move {
                            if let Err(e) = handle_client(stream, addr, manager, &config, cancel).await {
                                tracing::debug!(%addr, ?e, "client connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(?e, "failed to accept TCP connection");
                        // Backoff to prevent tight loop under sustained accept errors
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }

    drop(listener);
    tracker.close();
    if !tracker.is_empty() {
        tracing::info!(workers = tracker.len(), "waiting for connections to finish");
    }
    tracker.wait().await;

    let closed = tokio::task::spawn_blocking(move || manager.shutdown())
        .await
        .map_err(io::Error::other)?;
    tracing::info!(sessions = closed, "server stopped");
    Ok(())
}

async fn reap_idle_sessions(
    manager: Arc<SessionManager>,
    max_idle: Duration,
    cancel: CancellationToken,
) {
    let period = (max_idle / 2).clamp(Duration::from_secs(1), Duration::from_secs(60));
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let manager = manager.clone();
                match tokio::task::spawn_blocking(move || manager.reap_idle(max_idle)).await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(expired = n, "idle sweep"),
                    Err(e) => tracing::warn!(?e, "idle sweep failed"),
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    manager: Arc<SessionManager>,
    config: &ServerConfig,
    cancel: CancellationToken,
) -> io::Result<()> {
    let _ = stream.set_nodelay(true);
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        handshake(&mut reader, &mut writer, &config.auth_key),
    )
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "handshake timeout"))??;

    tracing::info!(%addr, "client connected");
    let result = run_commands(&mut reader, &mut writer, &manager, config.max_frame_bytes, &cancel).await;
    tracing::info!(%addr, "client disconnected");
    result
}

/// Challenge the client and answer `Welcome` once it proves the key.
async fn handshake<R, W>(reader: &mut R, writer: &mut W, key: &str) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let nonce = auth::new_nonce();
    send_control(writer, FrameType::Challenge, &ChallengeMsg { nonce: nonce.clone() }).await?;

    let frame = Frame::read_limited(reader, HANDSHAKE_MAX_PAYLOAD).await?;
    let verdict = if frame.frame_type == FrameType::ChallengeResponse {
        frame
            .parse_json::<ChallengeResponseMsg>()
            .map_err(|_| auth::AuthError::DigestMismatch)
            .and_then(|msg| auth::verify_digest(key, &nonce, &msg.digest))
    } else {
        Err(auth::AuthError::DigestMismatch)
    };

    match verdict {
        Ok(()) => send_control(writer, FrameType::Welcome, &WelcomeMsg::current()).await,
        Err(e) => {
            tracing::warn!(error = %e, "client failed authentication");
            let err = ErrorMsg {
                code: "auth_failed".to_string(),
                message: e.to_string(),
            };
            send_control(writer, FrameType::Error, &err).await?;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, e))
        }
    }
}

/// Request/reply loop. Ends on EOF, transport error, or shutdown.
async fn run_commands<R, W>(
    reader: &mut R,
    writer: &mut W,
    manager: &Arc<SessionManager>,
    max_payload: u32,
    cancel: &CancellationToken,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = Frame::read_limited(reader, max_payload) => match result {
                Ok(frame) => frame,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e),
            },
        };

        match frame.frame_type {
            FrameType::Command => {
                let line = frame.text_payload();
                let manager = manager.clone();
                let reply = tokio::task::spawn_blocking(move || manager.run_command(&line))
                    .await
                    .unwrap_or_else(|e| e.to_string());
                write_frame(&Frame::text(FrameType::Reply, &reply), writer).await?;
            }
            other => {
                let err = ErrorMsg {
                    code: "unexpected_frame".to_string(),
                    message: format!("expected Command, got {:?}", other),
                };
                send_control(writer, FrameType::Error, &err).await?;
            }
        }
    }
}

async fn send_control<W, T>(writer: &mut W, frame_type: FrameType, msg: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let frame = Frame::control(frame_type, msg).map_err(io::Error::other)?;
    write_frame(&frame, writer).await
}

/// Write a frame with a timeout.
async fn write_frame<W: AsyncWriteExt + Unpin>(frame: &Frame, writer: &mut W) -> io::Result<()> {
    tokio::time::timeout(WRITE_TIMEOUT, frame.write_to(writer))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timeout"))?
}

//! Argument channel between a secondary launch and the primary.
//!
//! A message is one frame: a 4-byte big-endian payload length followed by a
//! UTF-8 JSON array of path strings.

use std::fs;
use std::future::Future;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::error::ChannelError;

/// Largest payload accepted in either direction
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Connection-oriented local transport keyed by name
pub trait ChannelTransport: Send + Sync + 'static {
    type Listener: ChannelListener;
    type Stream: AsyncWrite + Unpin + Send + 'static;

    /// Create the endpoint. Only the lock holder calls this.
    fn bind(&self, name: &str) -> io::Result<Self::Listener>;

    fn connect(&self, name: &str) -> impl Future<Output = io::Result<Self::Stream>> + Send;

    /// Remove the endpoint created by `bind`
    fn cleanup(&self, name: &str);
}

pub trait ChannelListener: Send + 'static {
    type Stream: AsyncRead + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Unix domain sockets at `{dir}/{name}.sock`
#[derive(Debug, Clone)]
pub struct UnixTransport {
    dir: PathBuf,
}

impl UnixTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn socket_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.sock"))
    }
}

impl ChannelTransport for UnixTransport {
    type Listener = UnixListener;
    type Stream = UnixStream;

    fn bind(&self, name: &str) -> io::Result<UnixListener> {
        fs::create_dir_all(&self.dir)?;
        let path = self.socket_path(name);

        // Left over from a primary that died; only the lock holder gets here
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let listener = UnixListener::bind(&path)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        Ok(listener)
    }

    async fn connect(&self, name: &str) -> io::Result<UnixStream> {
        UnixStream::connect(self.socket_path(name)).await
    }

    fn cleanup(&self, name: &str) {
        let path = self.socket_path(name);
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("removed socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove socket {}: {e}", path.display()),
        }
    }
}

impl ChannelListener for UnixListener {
    type Stream = UnixStream;

    async fn accept(&mut self) -> io::Result<UnixStream> {
        UnixListener::accept(self).await.map(|(stream, _)| stream)
    }
}

/// Encode `args` as one frame
pub fn encode_frame(args: &[String]) -> Result<Vec<u8>, ChannelError> {
    let payload = serde_json::to_vec(args)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ChannelError::FrameTooLarge(payload.len()));
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Read one frame payload. The header and body may arrive in any number of
/// chunks.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ChannelError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Parse a frame payload. Anything but a JSON array of strings is empty.
pub fn decode_arguments(payload: &[u8]) -> Vec<String> {
    match serde_json::from_slice::<Vec<String>>(payload) {
        Ok(args) => args,
        Err(e) => {
            log::warn!("discarding malformed argument message: {e}");
            Vec::new()
        }
    }
}

/// Read one message from a forwarded connection. Errors and timeouts yield
/// an empty list.
pub async fn read_arguments<R>(mut reader: R, timeout: Duration) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    match tokio::time::timeout(timeout, read_frame(&mut reader)).await {
        Ok(Ok(payload)) => decode_arguments(&payload),
        Ok(Err(e)) => {
            log::warn!("failed to read forwarded arguments: {e}");
            Vec::new()
        }
        Err(_) => {
            log::warn!("forwarded arguments not received within {timeout:?}");
            Vec::new()
        }
    }
}

/// Connect, write one frame and close, all within `timeout`
pub async fn send_frame<T>(transport: &T, name: &str, frame: &[u8], timeout: Duration) -> Result<(), ChannelError>
where
    T: ChannelTransport,
{
    let attempt = async {
        let mut stream = transport.connect(name).await?;
        stream.write_all(frame).await?;
        stream.flush().await?;
        stream.shutdown().await?;
        Ok::<(), ChannelError>(())
    };
    tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| ChannelError::Timeout(timeout))?
}

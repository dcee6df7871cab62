//! In-process lock and transport for exercising the coordinator without
//! touching the file system.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use super::channel::{ChannelListener, ChannelTransport};
use super::lock::{ExclusiveLock, LockGuard};

const DUPLEX_BUFFER: usize = 64 * 1024;

/// Named locks shared by every clone
#[derive(Debug, Clone, Default)]
pub struct MemoryLocks {
    held: Arc<Mutex<HashSet<String>>>,
    broken: bool,
}

impl MemoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks whose every acquisition fails with an I/O error
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

struct MemoryGuard {
    name: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl Drop for MemoryGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.name);
    }
}

impl ExclusiveLock for MemoryLocks {
    fn try_acquire(&self, name: &str) -> io::Result<Option<LockGuard>> {
        if self.broken {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "lock unavailable"));
        }
        if !self.held.lock().insert(name.to_string()) {
            return Ok(None);
        }
        let guard = MemoryGuard {
            name: name.to_string(),
            held: Arc::clone(&self.held),
        };
        Ok(Some(LockGuard::new(name, guard)))
    }
}

/// Endpoints backed by `tokio::io::duplex` pairs
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    endpoints: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<DuplexStream>>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.endpoints.lock().contains_key(name)
    }
}

pub struct MemoryListener {
    incoming: mpsc::UnboundedReceiver<DuplexStream>,
}

impl ChannelTransport for MemoryTransport {
    type Listener = MemoryListener;
    type Stream = DuplexStream;

    fn bind(&self, name: &str) -> io::Result<MemoryListener> {
        let (tx, incoming) = mpsc::unbounded_channel();
        self.endpoints.lock().insert(name.to_string(), tx);
        Ok(MemoryListener { incoming })
    }

    async fn connect(&self, name: &str) -> io::Result<DuplexStream> {
        let endpoint = self.endpoints.lock().get(name).cloned();
        let endpoint = endpoint.ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionRefused, format!("no endpoint named {name}"))
        })?;
        let (client, server) = tokio::io::duplex(DUPLEX_BUFFER);
        endpoint
            .send(server)
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "listener closed"))?;
        Ok(client)
    }

    fn cleanup(&self, name: &str) {
        self.endpoints.lock().remove(name);
    }
}

impl ChannelListener for MemoryListener {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<DuplexStream> {
        self.incoming
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "endpoint removed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::channel::{encode_frame, read_arguments, send_frame};
    use std::time::Duration;

    #[test]
    fn test_memory_lock_is_exclusive_until_dropped() {
        let locks = MemoryLocks::new();
        let other_handle = locks.clone();

        let guard = locks.try_acquire("viewer").unwrap().unwrap();
        assert!(other_handle.try_acquire("viewer").unwrap().is_none());
        assert!(locks.is_held("viewer"));

        drop(guard);
        assert!(!locks.is_held("viewer"));
        assert!(other_handle.try_acquire("viewer").unwrap().is_some());
    }

    #[test]
    fn test_broken_lock_errors() {
        assert!(MemoryLocks::broken().try_acquire("viewer").is_err());
    }

    #[tokio::test]
    async fn test_memory_transport_delivers_frame() {
        let transport = MemoryTransport::new();
        let mut listener = transport.bind("viewer").unwrap();
        let frame = encode_frame(&["/tmp/a.png".to_string()]).unwrap();

        send_frame(&transport, "viewer", &frame, Duration::from_secs(1))
            .await
            .unwrap();
        let stream = listener.accept().await.unwrap();
        let received = read_arguments(stream, Duration::from_secs(1)).await;

        assert_eq!(received, vec!["/tmp/a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_connect_after_cleanup_refused() {
        let transport = MemoryTransport::new();
        let _listener = transport.bind("viewer").unwrap();
        transport.cleanup("viewer");
        assert!(!transport.is_bound("viewer"));
        assert!(transport.connect("viewer").await.is_err());
    }
}

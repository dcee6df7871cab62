//! Single-instance coordination.
//!
//! The first launch takes a per-user exclusive lock and listens on a local
//! channel. Later launches find the lock held, forward their arguments to
//! the listener and exit.

pub mod channel;
pub mod lock;
#[cfg(test)]
pub(crate) mod memory;
mod naming;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::InstanceConfig;
use channel::{ChannelListener, ChannelTransport, UnixTransport};
use lock::{ExclusiveLock, FileLock, LockGuard};

pub use naming::{resource_name, resource_name_for, ResourceKind};

// Pause after a failed accept so a broken endpoint cannot spin the loop
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Timing knobs for the coordinator
#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub ready_timeout: Duration,
    pub stop_timeout: Duration,
    pub notify_attempts: u32,
    pub notify_backoff: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self::from(&InstanceConfig::default())
    }
}

impl From<&InstanceConfig> for InstanceOptions {
    fn from(config: &InstanceConfig) -> Self {
        Self {
            ready_timeout: config.ready_timeout(),
            stop_timeout: config.stop_timeout(),
            notify_attempts: config.notify_attempts.max(1),
            notify_backoff: config.notify_backoff(),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        }
    }
}

/// Outcome of [`InstanceCoordinator::acquire`]
#[derive(Debug)]
pub enum Role {
    Primary(PrimaryInstance),
    /// Another process is primary. `delivered` reports whether the
    /// arguments reached it; the caller exits either way.
    Secondary { delivered: bool },
}

impl Role {
    pub fn is_primary(&self) -> bool {
        matches!(self, Role::Primary(_))
    }
}

pub struct InstanceCoordinator<L = FileLock, T = UnixTransport> {
    app_id: String,
    lock: L,
    transport: Arc<T>,
    options: InstanceOptions,
}

impl InstanceCoordinator<FileLock, UnixTransport> {
    /// Production coordinator: `flock` plus Unix sockets in the runtime dir
    pub fn from_config(config: &InstanceConfig) -> Self {
        let dir = config.runtime_dir();
        Self::new(
            config.app_id.clone(),
            FileLock::new(&dir),
            UnixTransport::new(&dir),
            InstanceOptions::from(config),
        )
    }
}

impl<L, T> InstanceCoordinator<L, T>
where
    L: ExclusiveLock,
    T: ChannelTransport,
{
    pub fn new(app_id: impl Into<String>, lock: L, transport: T, options: InstanceOptions) -> Self {
        Self {
            app_id: app_id.into(),
            lock,
            transport: Arc::new(transport),
            options,
        }
    }

    pub fn lock_name(&self) -> String {
        resource_name(&self.app_id, ResourceKind::Lock)
    }

    pub fn channel_name(&self) -> String {
        resource_name(&self.app_id, ResourceKind::Channel)
    }

    /// Become primary or hand `args` to the existing primary.
    ///
    /// As primary, `handler` receives every argument list forwarded by later
    /// launches, including empty ones. The listener is accepting (or has
    /// given up trying) by the time this returns.
    pub async fn acquire<H>(&self, args: &[String], handler: H) -> Role
    where
        H: Fn(Vec<String>) + Send + Sync + 'static,
    {
        let lock_name = self.lock_name();
        let guard = match self.lock.try_acquire(&lock_name) {
            Ok(Some(guard)) => Some(guard),
            Ok(None) => {
                log::info!("another instance holds {lock_name}; forwarding {} arguments", args.len());
                let delivered = self.notify_primary(args).await;
                return Role::Secondary { delivered };
            }
            Err(e) => {
                // Refusing to start would be worse than a second primary
                log::warn!("could not take {lock_name} ({e}); continuing as primary");
                None
            }
        };

        Role::Primary(self.start_primary(guard, handler).await)
    }

    /// Deliver `args` to the primary with bounded retries. Returns whether
    /// delivery succeeded.
    pub async fn notify_primary(&self, args: &[String]) -> bool {
        let frame = match channel::encode_frame(args) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("not forwarding arguments: {e}");
                return false;
            }
        };

        let name = self.channel_name();
        let attempts = self.options.notify_attempts.max(1);
        for attempt in 1..=attempts {
            match channel::send_frame(&*self.transport, &name, &frame, self.options.connect_timeout).await {
                Ok(()) => {
                    log::info!("forwarded arguments to primary on attempt {attempt}");
                    return true;
                }
                Err(e) => log::debug!("delivery attempt {attempt}/{attempts} failed: {e}"),
            }
            if attempt < attempts {
                tokio::time::sleep(self.options.notify_backoff * attempt).await;
            }
        }

        log::warn!("primary unreachable after {attempts} attempts; arguments dropped");
        false
    }

    async fn start_primary<H>(&self, guard: Option<LockGuard>, handler: H) -> PrimaryInstance
    where
        H: Fn(Vec<String>) + Send + Sync + 'static,
    {
        let name = self.channel_name();
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let listener = tokio::spawn(listen(
            Arc::clone(&self.transport),
            name.clone(),
            handler,
            self.options.read_timeout,
            cancel.clone(),
            ready_tx,
        ));

        let listening = match tokio::time::timeout(self.options.ready_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                log::info!("primary instance listening on {name}");
                true
            }
            Ok(Ok(Err(e))) => {
                log::warn!("could not open {name} ({e}); other launches cannot reach this one");
                false
            }
            Ok(Err(_)) => {
                log::warn!("listener for {name} exited before it was ready");
                false
            }
            Err(_) => {
                log::warn!("listener for {name} not ready within {:?}", self.options.ready_timeout);
                false
            }
        };

        let cleanup: Option<Box<dyn FnOnce() + Send + Sync>> = if listening {
            let transport = Arc::clone(&self.transport);
            Some(Box::new(move || transport.cleanup(&name)))
        } else {
            None
        };

        PrimaryInstance {
            lock: guard,
            cancel,
            listener: Some(listener),
            cleanup,
            stop_timeout: self.options.stop_timeout,
            listening,
        }
    }
}

async fn listen<T, H>(
    transport: Arc<T>,
    name: String,
    handler: H,
    read_timeout: Duration,
    cancel: CancellationToken,
    ready: oneshot::Sender<std::io::Result<()>>,
) where
    T: ChannelTransport,
    H: Fn(Vec<String>) + Send + Sync + 'static,
{
    let mut listener = match transport.bind(&name) {
        Ok(listener) => listener,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    loop {
        let accepted = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok(stream) => {
                let args = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    args = channel::read_arguments(stream, read_timeout) => args,
                };
                log::info!("received {} forwarded arguments", args.len());
                handler(args);
            }
            Err(e) => {
                log::warn!("accept on {name} failed: {e}");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
                }
            }
        }
    }
    log::debug!("listener on {name} stopped");
}

/// Resources owned by the primary process.
///
/// Call [`shutdown`](Self::shutdown) on exit. Dropping without it still
/// stops the listener and releases the lock, without waiting.
pub struct PrimaryInstance {
    lock: Option<LockGuard>,
    cancel: CancellationToken,
    listener: Option<JoinHandle<()>>,
    cleanup: Option<Box<dyn FnOnce() + Send + Sync>>,
    stop_timeout: Duration,
    listening: bool,
}

impl PrimaryInstance {
    /// Whether the argument channel came up
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// False when lock acquisition failed and this process started anyway
    pub fn holds_lock(&self) -> bool {
        self.lock.is_some()
    }

    /// Stop the listener, remove the channel endpoint and release the lock
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(mut listener) = self.listener.take() {
            match tokio::time::timeout(self.stop_timeout, &mut listener).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("listener task failed: {e}"),
                Err(_) => {
                    log::warn!("listener did not stop within {:?}; aborting", self.stop_timeout);
                    listener.abort();
                }
            }
        }
        self.release();
    }

    fn release(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
        if let Some(guard) = self.lock.take() {
            log::debug!("releasing {}", guard.name());
        }
    }
}

impl Drop for PrimaryInstance {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.release();
    }
}

impl fmt::Debug for PrimaryInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimaryInstance")
            .field("lock", &self.lock)
            .field("listening", &self.listening)
            .finish()
    }
}

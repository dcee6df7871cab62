use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{Command, CommandExecutor, CommandOutcome};
use crate::error::QueueError;

enum Envelope {
    Command(Command),
    /// Answered once every command queued before it has finished
    Barrier(oneshot::Sender<()>),
}

/// Cloneable producer handle. Enqueueing never blocks.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl CommandSender {
    /// Queue `command`; returns false once the queue has stopped
    pub fn enqueue(&self, command: Command) -> bool {
        log::debug!("enqueue {command}");
        match self.tx.send(Envelope::Command(command)) {
            Ok(()) => true,
            Err(mpsc::error::SendError(envelope)) => {
                if let Envelope::Command(command) = envelope {
                    log::warn!("command queue closed, dropping {command}");
                }
                false
            }
        }
    }
}

/// Serializes every state mutation through a single consumer task.
///
/// Commands run one at a time in enqueue order. A command that fails or
/// panics is logged and the next one proceeds.
pub struct CommandQueue {
    sender: CommandSender,
    pending: Mutex<Option<(mpsc::UnboundedReceiver<Envelope>, Arc<CommandExecutor>)>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl CommandQueue {
    pub fn new(executor: CommandExecutor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: CommandSender { tx },
            pending: Mutex::new(Some((rx, Arc::new(executor)))),
            worker: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn enqueue(&self, command: Command) -> bool {
        self.sender.enqueue(command)
    }

    /// Spawn the consumer. Commands enqueued earlier are kept and run first.
    /// Must be called from inside a tokio runtime.
    pub fn start(&self) -> Result<(), QueueError> {
        let (rx, executor) = self.pending.lock().take().ok_or(QueueError::AlreadyStarted)?;
        let handle = tokio::spawn(consume(rx, executor, self.cancel.clone()));
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Wait until everything enqueued before this call has been processed
    pub async fn flush(&self) -> Result<(), QueueError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.sender
            .tx
            .send(Envelope::Barrier(done_tx))
            .map_err(|_| QueueError::Closed)?;
        done_rx.await.map_err(|_| QueueError::Closed)
    }

    /// Cancel the consumer and wait for it to stop.
    ///
    /// The running command observes the cancellation; queued commands are
    /// dropped. A consumer that does not stop within `timeout` is aborted.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), QueueError> {
        self.cancel.cancel();
        let worker = self.worker.lock().take();
        match worker {
            Some(worker) => join_worker(worker, timeout).await,
            None => Ok(()),
        }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn consume(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    executor: Arc<CommandExecutor>,
    cancel: CancellationToken,
) {
    log::debug!("command queue started");
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            envelope = rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let command = match envelope {
            Envelope::Command(command) => command,
            Envelope::Barrier(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let label = command.to_string();
        log::debug!("processing {label}");

        // Own task per command so a panic is contained in its JoinError
        let task = {
            let executor = Arc::clone(&executor);
            let cancel = cancel.clone();
            tokio::spawn(async move { executor.execute(command, &cancel).await })
        };

        match task.await {
            Ok(Ok(CommandOutcome::Completed)) => {
                let state = executor.store().state();
                log::debug!(
                    "completed {label}: {} tabs, selected {:?}",
                    state.tab_count(),
                    state.selected_index()
                );
            }
            Ok(Ok(CommandOutcome::Cancelled)) => {
                log::info!("{label} cancelled");
                break;
            }
            Ok(Err(e)) => log::error!("{label} failed: {e}"),
            Err(e) if e.is_panic() => {
                log::error!("{label} panicked: {}", panic_message(e.into_panic()))
            }
            Err(e) => log::error!("{label} aborted: {e}"),
        }
    }
    log::debug!("command queue stopped");
}

async fn join_worker(mut worker: JoinHandle<()>, timeout: Duration) -> Result<(), QueueError> {
    match tokio::time::timeout(timeout, &mut worker).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(QueueError::ConsumerFaulted(join_failure(e))),
        Err(_) => {
            worker.abort();
            log::warn!("command queue did not stop within {timeout:?}; aborted");
            Err(QueueError::ShutdownTimedOut(timeout))
        }
    }
}

fn join_failure(e: JoinError) -> String {
    if e.is_panic() {
        panic_message(e.into_panic())
    } else {
        e.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Fixture;
    use crate::command::CommandSource;
    use crate::state::StateChangeEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn started(fixture: &Fixture) -> CommandQueue {
        let queue = CommandQueue::new(fixture.executor());
        queue.start().unwrap();
        queue
    }

    #[tokio::test]
    async fn test_commands_run_in_enqueue_order() {
        let fx = Fixture::new();
        let files: Vec<_> = (0..5).map(|i| fx.file(&format!("{i}.png"))).collect();
        let queue = started(&fx);

        for file in &files {
            assert!(queue.enqueue(Command::open_files([file], CommandSource::UserAction)));
        }
        queue.enqueue(Command::MoveTab { from: 4, to: 0 });
        queue.flush().await.unwrap();

        let state = fx.store.state();
        let order: Vec<_> = state.tabs().iter().map(|t| t.path().to_path_buf()).collect();
        let mut expected = files.clone();
        expected.rotate_right(1);
        assert_eq!(order, expected);
        assert_eq!(state.selected_index(), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_keep_their_own_order() {
        let fx = Fixture::new();
        let queue = started(&fx);

        let mut producers = Vec::new();
        for p in 0..4 {
            let files: Vec<_> = (0..5).map(|i| fx.file(&format!("p{p}_{i}.png"))).collect();
            let sender = queue.sender();
            producers.push(tokio::spawn(async move {
                for file in files {
                    sender.enqueue(Command::open_files([file], CommandSource::ExternalRequest));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        queue.flush().await.unwrap();

        let state = fx.store.state();
        assert_eq!(state.tab_count(), 20);
        for p in 0..4 {
            let prefix = format!("p{p}_");
            let mine: Vec<_> = state
                .tabs()
                .iter()
                .map(|t| t.file_name().to_string())
                .filter(|n| n.starts_with(&prefix))
                .collect();
            let expected: Vec<_> = (0..5).map(|i| format!("p{p}_{i}.png")).collect();
            assert_eq!(mine, expected);
        }
        assert_eq!(fx.decoder.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_failed_command_does_not_stop_queue() {
        let fx = Fixture::new();
        let a = fx.file("a.png");
        // A directory in place of the session file makes the final rename fail
        std::fs::create_dir(fx.sessions.path()).unwrap();
        std::fs::write(fx.sessions.path().join("keep"), b"x").unwrap();
        let queue = started(&fx);

        queue.enqueue(Command::SaveSession);
        queue.enqueue(Command::open_files([&a], CommandSource::UserAction));
        queue.flush().await.unwrap();

        assert_eq!(fx.store.state().tab_count(), 1);
    }

    #[tokio::test]
    async fn test_panicking_command_does_not_stop_queue() {
        let fx = Fixture::new();
        let a = fx.file("a.png");
        let executor = fx
            .executor()
            .with_activator(Arc::new(|| panic!("window went away")));
        let queue = CommandQueue::new(executor);
        queue.start().unwrap();

        queue.enqueue(Command::ActivateWindow);
        queue.enqueue(Command::open_files([&a], CommandSource::UserAction));
        queue.flush().await.unwrap();

        assert_eq!(fx.store.state().tab_count(), 1);
        queue.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_noop_command_publishes_nothing() {
        let fx = Fixture::new();
        let a = fx.file("a.png");
        let queue = started(&fx);
        queue.enqueue(Command::open_files([&a], CommandSource::UserAction));
        queue.flush().await.unwrap();

        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        fx.store.subscribe(move |_: &StateChangeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        queue.enqueue(Command::MoveTab { from: 0, to: 0 });
        queue.enqueue(Command::CloseTab(7));
        queue.enqueue(Command::SelectTab(0));
        queue.enqueue(Command::open_files([&a], CommandSource::UserAction));
        queue.flush().await.unwrap();

        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commands_enqueued_before_start_are_kept() {
        let fx = Fixture::new();
        let a = fx.file("a.png");
        let queue = CommandQueue::new(fx.executor());
        queue.enqueue(Command::open_files([&a], CommandSource::UserAction));
        queue.start().unwrap();
        queue.flush().await.unwrap();
        assert_eq!(fx.store.state().tab_count(), 1);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let fx = Fixture::new();
        let queue = started(&fx);
        assert!(matches!(queue.start(), Err(QueueError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_shutdown_closes_queue() {
        let fx = Fixture::new();
        let a = fx.file("a.png");
        let queue = started(&fx);

        queue.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(!queue.enqueue(Command::open_files([&a], CommandSource::UserAction)));
        assert!(matches!(queue.flush().await, Err(QueueError::Closed)));
        assert_eq!(fx.store.state().tab_count(), 0);
        // Second shutdown is a no-op
        queue.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_open() {
        let fx = Fixture::with_decode_delay(Duration::from_millis(50));
        let files: Vec<_> = (0..20).map(|i| fx.file(&format!("{i}.png"))).collect();
        let queue = started(&fx);

        queue.enqueue(Command::open_files(&files, CommandSource::UserAction));
        tokio::time::sleep(Duration::from_millis(80)).await;
        queue.shutdown(Duration::from_secs(2)).await.unwrap();

        assert!(fx.store.state().tab_count() < files.len());
    }

    #[tokio::test]
    async fn test_consumer_fault_is_reported() {
        let worker = tokio::spawn(async { panic!("consumer blew up") });
        match join_worker(worker, Duration::from_secs(1)).await {
            Err(QueueError::ConsumerFaulted(message)) => assert_eq!(message, "consumer blew up"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stuck_consumer_times_out() {
        let worker = tokio::spawn(std::future::pending::<()>());
        assert!(matches!(
            join_worker(worker, Duration::from_millis(20)).await,
            Err(QueueError::ShutdownTimedOut(_))
        ));
    }
}

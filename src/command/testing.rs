//! Shared fixtures for command and instance tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use parking_lot::Mutex;
use tempfile::TempDir;

use super::CommandExecutor;
use crate::decoder::{DecodedImage, ImageDecoder};
use crate::error::DecodeError;
use crate::session::FileSessionStore;
use crate::state::StateStore;

/// Decoder that never touches pixels. Files whose name contains "broken"
/// fail to decode.
#[derive(Default)]
pub(crate) struct StubDecoder {
    delay: Duration,
    decoded: Mutex<Vec<PathBuf>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl StubDecoder {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Paths in the order their decode finished
    pub(crate) fn decoded(&self) -> Vec<PathBuf> {
        self.decoded.lock().clone()
    }

    /// Highest number of decodes observed running at once
    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl ImageDecoder for StubDecoder {
    fn supported_extensions(&self) -> &[&str] {
        &["png", "jpg"]
    }

    fn decode(&self, path: &Path, _max_width: Option<u32>) -> Result<DecodedImage, DecodeError> {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.decoded.lock().push(path.to_path_buf());

        if path.to_string_lossy().contains("broken") {
            return Err(DecodeError::Unsupported(path.to_path_buf()));
        }
        Ok(DecodedImage {
            width: 2,
            height: 1,
            pixels: RgbaImage::new(2, 1),
        })
    }
}

pub(crate) struct Fixture {
    pub dir: TempDir,
    pub store: StateStore,
    pub decoder: Arc<StubDecoder>,
    pub sessions: Arc<FileSessionStore>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_decode_delay(Duration::ZERO)
    }

    pub(crate) fn with_decode_delay(delay: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(FileSessionStore::new(dir.path().join("session.json")));
        Self {
            dir,
            store: StateStore::new(),
            decoder: Arc::new(StubDecoder::with_delay(delay)),
            sessions,
        }
    }

    /// Create an empty file in the fixture directory
    pub(crate) fn file(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    pub(crate) fn executor(&self) -> CommandExecutor {
        CommandExecutor::new(
            self.store.clone(),
            Arc::clone(&self.decoder) as Arc<dyn ImageDecoder>,
            Arc::clone(&self.sessions) as Arc<dyn crate::session::SessionStore>,
        )
    }
}

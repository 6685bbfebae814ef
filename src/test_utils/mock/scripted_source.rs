use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::source::Source;
use crate::ContentType;
use crate::Result;
use crate::SourceError;

/// In-memory [`Source`] whose content, latency and failures are driven by
/// the test
///
/// Counts fetches and records writes. Use `MockSource` instead when exact
/// call expectations matter.
#[derive(Debug)]
pub struct ScriptedSource {
    content: Mutex<Option<Vec<u8>>>,
    content_type: ContentType,
    failing: AtomicBool,
    fetches: AtomicUsize,
    writes: Mutex<Vec<Vec<u8>>>,
    delay: Duration,
    push: Option<broadcast::Sender<()>>,
}

impl ScriptedSource {
    pub fn new(content: &str) -> Self {
        Self {
            content: Mutex::new(Some(content.as_bytes().to_vec())),
            content_type: ContentType::Json,
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            push: None,
        }
    }

    pub fn with_content_type(
        mut self,
        content_type: ContentType,
    ) -> Self {
        self.content_type = content_type;
        self
    }

    /// Every fetch blocks for `delay`
    pub fn with_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.delay = delay;
        self
    }

    /// Exposes a push channel, fired with [`ScriptedSource::push`]
    pub fn with_push(mut self) -> Self {
        self.push = Some(broadcast::channel(4).0);
        self
    }

    pub fn set_content(
        &self,
        content: &str,
    ) {
        *self.content.lock() = Some(content.as_bytes().to_vec());
    }

    pub fn clear_content(&self) {
        *self.content.lock() = None;
    }

    pub fn set_failing(
        &self,
        failing: bool,
    ) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    /// Signals the push channel; returns false without one or without
    /// subscribers
    pub fn push(&self) -> bool {
        match &self.push {
            Some(sender) => sender.send(()).is_ok(),
            None => false,
        }
    }

    fn check_failing(
        &self,
        key: &str,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Store {
                key: key.to_string(),
                message: "scripted failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Source for ScriptedSource {
    fn content_type(
        &self,
        _key: &str,
    ) -> ContentType {
        self.content_type
    }

    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.check_failing(key)?;
        Ok(self.content.lock().clone().filter(|c| !c.is_empty()))
    }

    fn set(
        &self,
        key: &str,
        content: &[u8],
    ) -> Result<()> {
        self.check_failing(key)?;
        *self.content.lock() = Some(content.to_vec());
        self.writes.lock().push(content.to_vec());
        Ok(())
    }

    fn watch(
        &self,
        _key: &str,
    ) -> Option<broadcast::Receiver<()>> {
        self.push.as_ref().map(|sender| sender.subscribe())
    }
}

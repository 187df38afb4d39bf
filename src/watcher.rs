// src/watcher.rs
//! Long-poll watcher for the extraction queue.
//!
//! One spawned task (a "chain") runs poll steps until the watcher stops, a
//! 401 arrives, or a newer chain replaces it. Each chain carries the
//! generation it was started with; any `stop` or `force_reconnect` bumps the
//! generation and cancels the chain's token, so an old chain exits at its
//! next await point without scheduling anything. A new chain waits for the
//! previous chain's task to finish before issuing its first request, which
//! keeps at most one long-poll connection open per watcher.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::AuthTokenProvider;
use crate::core::{QueueApi, WatcherConfig};
use crate::display::DisplaySink;
use crate::error::{ApiError, WatchError};
use crate::types::QueueItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPhase {
    Stopped,
    Watching,
    /// The server answered 401; `start` again after re-authentication
    AuthLost,
}

#[derive(Default)]
struct Control {
    active: bool,
    generation: u64,
    cancel: Option<CancellationToken>,
    chain: Option<JoinHandle<()>>,
}

impl Control {
    fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }
}

struct Inner {
    api: Arc<dyn QueueApi>,
    tokens: Arc<dyn AuthTokenProvider>,
    sink: Arc<dyn DisplaySink>,
    config: WatcherConfig,
    control: Mutex<Control>,
    phase: watch::Sender<WatcherPhase>,
}

enum Step {
    Next(Duration),
    Halt,
}

pub struct QueueWatcher {
    inner: Arc<Inner>,
}

impl QueueWatcher {
    pub fn new(
        api: Arc<dyn QueueApi>,
        tokens: Arc<dyn AuthTokenProvider>,
        sink: Arc<dyn DisplaySink>,
        config: WatcherConfig,
    ) -> Self {
        let (phase, _) = watch::channel(WatcherPhase::Stopped);
        Self {
            inner: Arc::new(Inner {
                api,
                tokens,
                sink,
                config,
                control: Mutex::new(Control::default()),
                phase,
            }),
        }
    }

    /// Begin watching. No-op when already active. Needs a tokio runtime.
    pub fn start(&self) {
        let mut control = self.inner.control.lock();
        if control.active {
            debug!("Queue watcher already active");
            return;
        }
        control.active = true;
        Inner::spawn_chain(&self.inner, &mut control);
        self.inner.phase.send_replace(WatcherPhase::Watching);
        info!("Queue watcher started");
    }

    /// Stop watching and abort the in-flight long-poll. No-op when stopped.
    pub fn stop(&self) {
        let mut control = self.inner.control.lock();
        if !control.active {
            return;
        }
        control.active = false;
        control.generation += 1;
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
        self.inner.phase.send_replace(WatcherPhase::Stopped);
        info!("Queue watcher stopped");
    }

    /// Drop the current connection or delay and poll again right away
    pub fn force_reconnect(&self) {
        let mut control = self.inner.control.lock();
        if !control.active {
            debug!("Reconnect requested while inactive, ignoring");
            return;
        }
        Inner::spawn_chain(&self.inner, &mut control);
        info!("Queue watcher reconnecting");
    }

    /// One snapshot fetch, independent of the long-poll cycle
    pub async fn refresh_once(&self) -> Result<Vec<QueueItem>, WatchError> {
        let token = self
            .inner
            .tokens
            .token()
            .await
            .ok_or(WatchError::MissingToken)?;

        let items = self.inner.api.fetch_queue(&token).await?;
        self.inner.sink.render(&items);
        Ok(items)
    }

    pub fn is_active(&self) -> bool {
        self.inner.control.lock().active
    }

    pub fn phase(&self) -> WatcherPhase {
        *self.inner.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatcherPhase> {
        self.inner.phase.subscribe()
    }
}

impl Drop for QueueWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    /// Replace the running chain, if any, with a fresh one
    fn spawn_chain(inner: &Arc<Self>, control: &mut Control) {
        control.generation += 1;
        let generation = control.generation;

        let cancel = CancellationToken::new();
        if let Some(previous) = control.cancel.replace(cancel.clone()) {
            previous.cancel();
        }
        let previous = control.chain.take();

        let inner = Arc::clone(inner);
        control.chain = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                // the old chain drops its request when it sees its token
                let _ = previous.await;
            }
            inner.run_chain(generation, cancel).await;
        }));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.control.lock().is_current(generation)
    }

    async fn run_chain(&self, generation: u64, cancel: CancellationToken) {
        debug!("Poll chain {} running", generation);

        loop {
            if !self.is_current(generation) {
                break;
            }

            let delay = match self.step(generation, &cancel).await {
                Step::Next(delay) => delay,
                Step::Halt => break,
            };

            debug!("Next poll in {:?}", delay);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("Poll chain {} finished", generation);
    }

    async fn step(&self, generation: u64, cancel: &CancellationToken) -> Step {
        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Step::Halt,
            token = self.tokens.token() => token,
        };

        let Some(token) = token else {
            debug!("No auth token available");
            return Step::Next(self.config.retry_delay());
        };

        // A stop landing after this check is seen by the biased cancel arm
        // before the request is polled; one landing during that first poll
        // drops the request at the next wakeup.
        if !self.is_current(generation) {
            return Step::Halt;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Step::Halt,
            result = self.api.watch_queue(&token) => result,
        };

        match result {
            Ok(items) => {
                {
                    let control = self.control.lock();
                    if !control.is_current(generation) {
                        return Step::Halt;
                    }
                    self.sink.render(&items);
                }

                if items.iter().any(QueueItem::is_active) {
                    Step::Next(self.config.active_delay())
                } else {
                    Step::Next(self.config.idle_delay())
                }
            }
            Err(ApiError::Unauthorized) => {
                self.halt_unauthorized(generation);
                Step::Halt
            }
            Err(e) => {
                warn!("Queue watch failed, retrying: {}", e);
                Step::Next(self.config.retry_delay())
            }
        }
    }

    fn halt_unauthorized(&self, generation: u64) {
        let mut control = self.control.lock();
        if !control.is_current(generation) {
            return;
        }
        control.active = false;
        control.cancel = None;
        self.phase.send_replace(WatcherPhase::AuthLost);
        warn!("Queue server rejected the auth token, watcher halted");
    }
}

// src/web/queue_store.rs
//! In-memory extraction queue backing the sandbox server

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::types::{DuplicateInfo, EnqueueRequest, ExtractionResult, QueueItem, QueueStatus};

#[derive(Default)]
struct StoreState {
    items: Vec<QueueItem>,
    /// url -> job id of finished extractions
    completed: HashMap<String, String>,
    /// watch client -> version of the last snapshot it was answered with
    answered: HashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    Created(QueueItem),
    /// Same URL is already pending or processing
    InFlight(QueueItem),
    Duplicate(DuplicateInfo),
}

/// Version is bumped while the state lock is held, so a snapshot taken
/// under the lock always matches the version read with it.
#[derive(Clone)]
pub struct QueueStore {
    state: Arc<Mutex<StoreState>>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            version: Arc::new(version),
        }
    }

    /// Items in enqueue order
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.state.lock().items.clone()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    pub fn enqueue(&self, request: &EnqueueRequest) -> Enqueued {
        let mut state = self.state.lock();

        if let Some(job_id) = state.completed.get(&request.url) {
            return Enqueued::Duplicate(DuplicateInfo {
                is_duplicate: true,
                message: "This job posting was already extracted".to_string(),
                existing_job_id: Some(job_id.clone()),
            });
        }

        if let Some(existing) = state.items.iter_mut().find(|item| item.url == request.url) {
            if existing.is_active() {
                return Enqueued::InFlight(existing.clone());
            }
            // a failed extraction may be retried
            *existing = QueueItem::new(request.url.clone(), QueueStatus::pending());
            let item = existing.clone();
            self.bump();
            drop(state);
            info!("Re-queued {} (priority {})", request.url, request.priority);
            return Enqueued::Created(item);
        }

        let item = QueueItem::new(request.url.clone(), QueueStatus::pending());
        state.items.push(item.clone());
        self.bump();
        drop(state);

        info!(
            "Queued {} (priority {}, pre-extracted html: {})",
            request.url,
            request.priority,
            request.pre_extracted_html.is_some()
        );
        Enqueued::Created(item)
    }

    fn update<F>(&self, url: &str, apply: F) -> bool
    where
        F: FnOnce(&mut StoreState, usize),
    {
        let mut state = self.state.lock();
        let Some(index) = state.items.iter().position(|item| item.url == url) else {
            return false;
        };
        apply(&mut state, index);
        self.bump();
        true
    }

    pub fn mark_processing(&self, url: &str, step: &str, progress: f64) -> bool {
        self.update(url, |state, index| {
            let item = &mut state.items[index];
            item.status = QueueStatus::processing();
            item.current_step = Some(step.to_string());
            item.progress = Some(progress);
        })
    }

    /// Returns the new job id, or `None` for an unknown URL
    pub fn mark_completed(&self, url: &str) -> Option<String> {
        let job_id = uuid::Uuid::new_v4().simple().to_string();
        let updated = self.update(url, |state, index| {
            let item = &mut state.items[index];
            item.status = QueueStatus::completed();
            item.current_step = None;
            item.progress = None;
            item.result = Some(ExtractionResult {
                job_id: job_id.clone(),
            });
            state.completed.insert(url.to_string(), job_id.clone());
        });
        updated.then_some(job_id)
    }

    pub fn mark_failed(&self, url: &str, error: &str) -> bool {
        self.update(url, |state, index| {
            let item = &mut state.items[index];
            item.status = QueueStatus::failed();
            item.current_step = None;
            item.progress = None;
            item.error = Some(error.to_string());
        })
    }

    /// Long-poll for `client`: answers at once when the queue changed since
    /// that client's last answer, otherwise holds until the next change or
    /// `timeout`.
    pub async fn wait_for_change(&self, client: &str, timeout: Duration) -> Vec<QueueItem> {
        let mut changes = self.version.subscribe();
        let current = *changes.borrow_and_update();
        let seen = self
            .state
            .lock()
            .answered
            .get(client)
            .copied()
            .unwrap_or(0);

        if current > seen {
            debug!("Queue at version {}, client last saw {}", current, seen);
        } else {
            match tokio::time::timeout(timeout, changes.changed()).await {
                Ok(_) => debug!("Queue changed, answering long-poll"),
                Err(_) => debug!("Long-poll timed out without changes"),
            }
        }

        let mut state = self.state.lock();
        let version = *self.version.borrow();
        state.answered.insert(client.to_string(), version);
        state.items.clone()
    }
}

// src/display.rs
//! Display sink contract and the queue presentation model

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::types::QueueItem;

/// Receives the full queue after every successful poll or refresh.
///
/// `render` runs while the watcher holds its control lock: implementations
/// must not call back into the watcher.
pub trait DisplaySink: Send + Sync + 'static {
    fn render(&self, items: &[QueueItem]);
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub url: String,
    pub status: String,
    pub current_step: Option<String>,
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub job_link: Option<String>,
    pub active: bool,
}

impl QueueRow {
    pub fn from_item(item: &QueueItem) -> Self {
        let processing = item.status.as_str() == crate::types::QueueStatus::PROCESSING;
        Self {
            url: item.url.clone(),
            status: item.status.label(),
            current_step: item.current_step.clone().filter(|_| processing),
            progress: item
                .progress
                .filter(|_| processing)
                .map(|p| p.clamp(0.0, 100.0).round() as u8),
            error: item.error.clone().filter(|_| item.status.is_failed()),
            job_link: item.job_link(),
            active: item.is_active(),
        }
    }

    pub fn is_clickable(&self) -> bool {
        self.job_link.is_some()
    }
}

/// What the queue panel shows
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueueView {
    /// Nothing received yet
    #[default]
    Loading,
    /// Received, and the queue is empty
    Empty,
    Items(Vec<QueueRow>),
}

impl QueueView {
    pub fn from_items(items: &[QueueItem]) -> Self {
        if items.is_empty() {
            QueueView::Empty
        } else {
            QueueView::Items(items.iter().map(QueueRow::from_item).collect())
        }
    }

    pub fn rows(&self) -> &[QueueRow] {
        match self {
            QueueView::Items(rows) => rows,
            QueueView::Loading | QueueView::Empty => &[],
        }
    }

    pub fn count(&self) -> usize {
        self.rows().len()
    }

    pub fn active_count(&self) -> usize {
        self.rows().iter().filter(|row| row.active).count()
    }
}

/// Keeps the latest view in memory
#[derive(Default)]
pub struct ViewSink {
    view: Mutex<QueueView>,
    renders: Mutex<usize>,
}

impl ViewSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> QueueView {
        self.view.lock().clone()
    }

    pub fn render_count(&self) -> usize {
        *self.renders.lock()
    }
}

impl DisplaySink for ViewSink {
    fn render(&self, items: &[QueueItem]) {
        *self.view.lock() = QueueView::from_items(items);
        *self.renders.lock() += 1;
    }
}

/// Prints the queue to stdout
pub struct ConsoleSink {
    app_url: String,
}

impl ConsoleSink {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn format(&self, view: &QueueView, at: DateTime<Local>) -> String {
        let mut out = String::new();
        let stamp = at.format("%H:%M:%S");

        match view {
            QueueView::Loading => {
                out.push_str(&format!("[{}] Loading queue...\n", stamp));
            }
            QueueView::Empty => {
                out.push_str(&format!("[{}] Extraction queue is empty\n", stamp));
            }
            QueueView::Items(rows) => {
                out.push_str(&format!(
                    "[{}] Extraction queue: {} item(s), {} in progress\n",
                    stamp,
                    view.count(),
                    view.active_count()
                ));
                for row in rows {
                    out.push_str(&format!("  {:<11} {}", row.status, row.url));
                    if let Some(step) = &row.current_step {
                        out.push_str(&format!(" | {}", step));
                    }
                    if let Some(progress) = row.progress {
                        out.push_str(&format!(" {}%", progress));
                    }
                    if let Some(error) = &row.error {
                        out.push_str(&format!(" | {}", error));
                    }
                    if let Some(link) = &row.job_link {
                        out.push_str(&format!(" -> {}{}", self.app_url, link));
                    }
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl DisplaySink for ConsoleSink {
    fn render(&self, items: &[QueueItem]) {
        let view = QueueView::from_items(items);
        print!("{}", self.format(&view, Local::now()));
    }
}

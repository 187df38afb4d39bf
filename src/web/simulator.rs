// src/web/simulator.rs
//! Fake extraction progress for sandbox items

use reqwest::Url;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::queue_store::QueueStore;

const STEPS: [(&str, f64); 3] = [
    ("Fetching posting", 10.0),
    ("Extracting details", 50.0),
    ("Scoring match", 90.0),
];

fn is_extractable(url: &str) -> bool {
    Url::parse(url)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub fn spawn(store: QueueStore, url: String, step_delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move { run(store, url, step_delay).await })
}

async fn run(store: QueueStore, url: String, step_delay: Duration) {
    tokio::time::sleep(step_delay).await;

    if !is_extractable(&url) {
        warn!("Cannot extract {}: not an http(s) URL", url);
        store.mark_failed(&url, "Only http(s) job postings can be extracted");
        return;
    }

    for (step, progress) in STEPS {
        if !store.mark_processing(&url, step, progress) {
            return;
        }
        tokio::time::sleep(step_delay).await;
    }

    if let Some(job_id) = store.mark_completed(&url) {
        info!("Extraction of {} finished as job {}", url, job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnqueueRequest;

    fn enqueue(store: &QueueStore, url: &str) {
        store.enqueue(&EnqueueRequest {
            url: url.to_string(),
            priority: 1,
            pre_extracted_html: None,
        });
    }

    #[test]
    fn test_is_extractable() {
        assert!(is_extractable("https://www.linkedin.com/jobs/view/1"));
        assert!(is_extractable("http://localhost/job"));
        assert!(!is_extractable("ftp://a.com/job"));
        assert!(!is_extractable("not a url"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_walks_through_steps() {
        let store = QueueStore::new();
        enqueue(&store, "https://a.com/job");

        let handle = spawn(store.clone(), "https://a.com/job".to_string(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let item = store.snapshot().remove(0);
        assert_eq!(item.status.as_str(), "PROCESSING");
        assert_eq!(item.current_step.as_deref(), Some("Fetching posting"));

        handle.await.unwrap();
        let item = store.snapshot().remove(0);
        assert!(item.status.is_completed());
        assert!(item.job_link().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_http_url_fails() {
        let store = QueueStore::new();
        enqueue(&store, "ftp://a.com/job");

        spawn(store.clone(), "ftp://a.com/job".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        let item = store.snapshot().remove(0);
        assert!(item.status.is_failed());
        assert!(item.error.is_some());
    }
}

// src/types/queue.rs
//! Wire types shared by the queue client and the sandbox server

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status token of a queue item, kept exactly as transmitted.
///
/// Logic branches compare the raw token case-sensitively; display goes
/// through [`QueueStatus::label`], which ignores casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueStatus(String);

impl QueueStatus {
    pub const PENDING: &'static str = "PENDING";
    pub const PROCESSING: &'static str = "PROCESSING";
    pub const COMPLETED: &'static str = "COMPLETED";
    pub const FAILED: &'static str = "FAILED";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn pending() -> Self {
        Self::new(Self::PENDING)
    }

    pub fn processing() -> Self {
        Self::new(Self::PROCESSING)
    }

    pub fn completed() -> Self {
        Self::new(Self::COMPLETED)
    }

    pub fn failed() -> Self {
        Self::new(Self::FAILED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Work is still in flight for this item
    pub fn is_active(&self) -> bool {
        self.0 == Self::PENDING || self.0 == Self::PROCESSING
    }

    pub fn is_completed(&self) -> bool {
        self.0 == Self::COMPLETED
    }

    pub fn is_failed(&self) -> bool {
        self.0 == Self::FAILED
    }

    /// Human readable label, e.g. "processing" -> "Processing"
    pub fn label(&self) -> String {
        let lower = self.0.trim().to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub job_id: String,
}

/// One job-extraction task tracked by the server, identified by its URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub url: String,
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtractionResult>,
}

impl QueueItem {
    pub fn new(url: impl Into<String>, status: QueueStatus) -> Self {
        Self {
            url: url.into(),
            status,
            current_step: None,
            progress: None,
            error: None,
            result: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Deep link to the created job record, only for completed items
    pub fn job_link(&self) -> Option<String> {
        if !self.status.is_completed() {
            return None;
        }
        self.result
            .as_ref()
            .map(|result| format!("/jobs/{}", result.job_id))
    }
}

/// Body of both the snapshot and the watch endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub queue: Vec<QueueItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub url: String,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_extracted_html: Option<String>,
}

/// 409 payload returned when the URL was already extracted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateInfo {
    pub is_duplicate: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub existing_job_id: Option<String>,
}

impl DuplicateInfo {
    pub fn job_link(&self) -> Option<String> {
        self.existing_job_id
            .as_ref()
            .map(|job_id| format!("/jobs/{}", job_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// Accepted by the server; the body is kept as-is since its shape varies
    Queued(serde_json::Value),
    Duplicate(DuplicateInfo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_logic_is_case_sensitive() {
        assert!(QueueStatus::new("PENDING").is_active());
        assert!(QueueStatus::new("PROCESSING").is_active());
        assert!(!QueueStatus::new("pending").is_active());
        assert!(!QueueStatus::new("COMPLETED").is_active());
        assert!(!QueueStatus::new("Completed").is_completed());
    }

    #[test]
    fn test_status_label_ignores_case() {
        assert_eq!(QueueStatus::new("PROCESSING").label(), "Processing");
        assert_eq!(QueueStatus::new("processing").label(), "Processing");
        assert_eq!(QueueStatus::new("").label(), "Unknown");
    }

    #[test]
    fn test_item_parses_camel_case_fields() {
        let json = r#"{
            "url": "https://a.com/job",
            "status": "PROCESSING",
            "currentStep": "Extracting details",
            "progress": 50
        }"#;
        let item: QueueItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.current_step.as_deref(), Some("Extracting details"));
        assert_eq!(item.progress, Some(50.0));
        assert!(item.is_active());
        assert_eq!(item.job_link(), None);
    }

    #[test]
    fn test_completed_item_links_to_job() {
        let json = r#"{"url":"https://a.com/job","status":"COMPLETED","result":{"jobId":"abc123"}}"#;
        let item: QueueItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.job_link().as_deref(), Some("/jobs/abc123"));
    }

    #[test]
    fn test_snapshot_without_queue_field_is_empty() {
        let snapshot: QueueSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.queue.is_empty());
    }

    #[test]
    fn test_enqueue_request_omits_missing_html() {
        let request = EnqueueRequest {
            url: "https://a.com/job".to_string(),
            priority: 1,
            pre_extracted_html: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"url": "https://a.com/job", "priority": 1})
        );
    }
}

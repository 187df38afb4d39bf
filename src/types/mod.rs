// src/types/mod.rs
pub mod queue;

pub use queue::{
    DuplicateInfo, EnqueueOutcome, EnqueueRequest, ExtractionResult, QueueItem, QueueSnapshot,
    QueueStatus,
};

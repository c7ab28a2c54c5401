//! Batch enrichment session state machine
//!
//! A session moves Running → Completed (or Cancelled). The orchestrator
//! owns at most one live session at a time; starting a new one while the
//! current session is running is refused at the API with 409.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enrichment run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrichmentState {
    /// Items are being processed, one at a time
    Running,
    /// The run visited every item (individual failures included)
    Completed,
    /// The run was stopped at an item boundary
    Cancelled,
}

/// Progress snapshot, broadcast after every processed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentProgress {
    pub completed: usize,
    pub total: usize,
    pub running: bool,
}

/// One item's failure inside a run; never aborts the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentItemError {
    pub item_id: Uuid,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// In-memory state of one batch enrichment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSession {
    pub session_id: Uuid,
    pub state: EnrichmentState,
    pub progress: EnrichmentProgress,
    /// Items that received at least one enriched field
    pub enriched: usize,
    pub errors: Vec<EnrichmentItemError>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl EnrichmentSession {
    /// Create a fresh session over a collection snapshot of `total` items
    pub fn new(total: usize) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: EnrichmentState::Running,
            progress: EnrichmentProgress {
                completed: 0,
                total,
                running: true,
            },
            enriched: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to a new state, stamping the end time on terminal states
    pub fn transition_to(&mut self, new_state: EnrichmentState) {
        self.state = new_state;
        match new_state {
            EnrichmentState::Completed | EnrichmentState::Cancelled => {
                self.progress.running = false;
                self.ended_at = Some(Utc::now());
            }
            EnrichmentState::Running => {
                self.progress.running = true;
            }
        }
    }

    /// Record another processed item
    pub fn record_completed(&mut self, enriched: bool) {
        self.progress.completed += 1;
        if enriched {
            self.enriched += 1;
        }
    }

    /// Record a per-item failure
    pub fn record_error(&mut self, item_id: Uuid, message: String) {
        self.errors.push(EnrichmentItemError {
            item_id,
            message,
            at: Utc::now(),
        });
    }

    pub fn is_running(&self) -> bool {
        self.state == EnrichmentState::Running
    }

    /// Wall-clock duration of the run so far (or total, once ended)
    pub fn duration_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        end.signed_duration_since(self.started_at).num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_running() {
        let session = EnrichmentSession::new(5);
        assert!(session.is_running());
        assert_eq!(session.progress.total, 5);
        assert_eq!(session.progress.completed, 0);
        assert!(session.progress.running);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_terminal_transition_stamps_end() {
        let mut session = EnrichmentSession::new(2);
        session.record_completed(true);
        session.record_completed(false);
        session.transition_to(EnrichmentState::Completed);

        assert!(!session.is_running());
        assert!(!session.progress.running);
        assert!(session.ended_at.is_some());
        assert_eq!(session.progress.completed, 2);
        assert_eq!(session.enriched, 1);
    }

    #[test]
    fn test_errors_accumulate_without_ending_run() {
        let mut session = EnrichmentSession::new(3);
        session.record_error(Uuid::new_v4(), "provider timeout".to_string());
        session.record_completed(false);

        assert!(session.is_running());
        assert_eq!(session.errors.len(), 1);
    }
}

//! Status collaborator boundary.
//!
//! The coordinator reports stage progress to an external task manager
//! through [`StatusSink`]. Binding a sink is optional; when none is bound,
//! status updates are simply skipped. [`TaskStatusBoard`] is the built-in
//! in-memory implementation used by the CLI.

use chrono::Utc;
use fab_protocol::flow_models::{StageStatus, TaskRecord, UtilizationSample};
use fab_protocol::stage_models::Stage;
use std::collections::HashMap;
use std::sync::Mutex;

/// Receives per-stage status and utilization updates from the coordinator.
///
/// Implementations must tolerate updates from worker tasks; the coordinator
/// calls these methods on whatever task a compile runs on.
pub trait StatusSink: Send + Sync {
    /// The stage's status changed.
    fn set_status(&self, stage: Stage, status: StageStatus);

    /// A successful run produced a utilization sample.
    fn set_utilization(&self, stage: Stage, sample: UtilizationSample);
}

/// In-memory task status board, one record per stage.
#[derive(Default)]
pub struct TaskStatusBoard {
    records: Mutex<HashMap<Stage, TaskRecord>>,
}

impl TaskStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for one stage, if it has ever been updated.
    pub fn record(&self, stage: Stage) -> Option<TaskRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(&stage).cloned())
    }

    /// All records, in pipeline order.
    pub fn all(&self) -> Vec<TaskRecord> {
        let records = match self.records.lock() {
            Ok(records) => records,
            Err(_) => return Vec::new(),
        };
        Stage::ALL
            .iter()
            .filter_map(|stage| records.get(stage).cloned())
            .collect()
    }
}

impl StatusSink for TaskStatusBoard {
    fn set_status(&self, stage: Stage, status: StageStatus) {
        if let Ok(mut records) = self.records.lock() {
            let record = records.entry(stage).or_insert_with(|| TaskRecord {
                stage,
                status: StageStatus::NotStarted,
                utilization: None,
                updated_at: Utc::now(),
            });
            record.status = status;
            record.updated_at = Utc::now();
        }
    }

    fn set_utilization(&self, stage: Stage, sample: UtilizationSample) {
        if let Ok(mut records) = self.records.lock() {
            if let Some(record) = records.get_mut(&stage) {
                record.utilization = Some(sample);
                record.updated_at = Utc::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_starts_empty() {
        let board = TaskStatusBoard::new();
        assert!(board.all().is_empty());
        assert!(board.record(Stage::Synthesize).is_none());
    }

    #[test]
    fn test_status_updates_recorded() {
        let board = TaskStatusBoard::new();
        board.set_status(Stage::Synthesize, StageStatus::InProgress);
        board.set_status(Stage::Synthesize, StageStatus::Success);

        let record = board.record(Stage::Synthesize).unwrap();
        assert_eq!(record.status, StageStatus::Success);
    }

    #[test]
    fn test_utilization_attaches_to_existing_record() {
        let board = TaskStatusBoard::new();
        board.set_status(Stage::Route, StageStatus::Success);
        board.set_utilization(
            Stage::Route,
            UtilizationSample {
                peak_memory_bytes: 1024,
                duration_ms: 10,
            },
        );

        let record = board.record(Stage::Route).unwrap();
        assert_eq!(record.utilization.unwrap().peak_memory_bytes, 1024);
    }

    #[test]
    fn test_all_is_in_pipeline_order() {
        let board = TaskStatusBoard::new();
        board.set_status(Stage::Route, StageStatus::Success);
        board.set_status(Stage::Analyze, StageStatus::Fail);

        let all = board.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].stage, Stage::Analyze);
        assert_eq!(all[1].stage, Stage::Route);
    }
}

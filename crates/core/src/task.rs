//! Task model and the task-store collaborator boundary.
//!
//! Task CRUD and persistence live outside this system; the timer only needs
//! to resolve the active task for sync snapshots and to record progress when
//! a work session completes naturally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::AccountId;
use crate::error::Result;

/// Task identifier in the external task store.
pub type TaskId = i64;

/// The slice of a task the timer cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed_pomodoros: u32,
    pub estimated_pomodoros: Option<u32>,
}

/// External task-store collaborator.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Resolve a task owned by the account, if it exists.
    async fn get_task(&self, account: &AccountId, task_id: TaskId) -> Result<Option<Task>>;

    /// Record one completed work session against a task. Called exactly
    /// once per naturally completed work session.
    async fn increment_completed_pomodoros(
        &self,
        account: &AccountId,
        task_id: TaskId,
    ) -> Result<()>;
}

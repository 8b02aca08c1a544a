//! In-memory collaborator stores.
//!
//! Task and settings persistence are external to this system; these
//! implementations are the default backing for the daemon and the test
//! harness. A deployment with real stores swaps them behind the same
//! traits.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use timer_core::{
    AccountId, Error, PresetTable, Result, SettingsStore, Task, TaskId, TaskStore,
};

/// In-memory task store keyed by account.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<AccountId, HashMap<TaskId, Task>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a task for an account.
    pub fn insert_task(&self, account: &AccountId, task: Task) {
        self.tasks
            .write()
            .entry(account.clone())
            .or_default()
            .insert(task.id, task);
    }

    /// Read a task back, mainly for assertions in tests.
    pub fn task(&self, account: &AccountId, task_id: TaskId) -> Option<Task> {
        self.tasks
            .read()
            .get(account)
            .and_then(|tasks| tasks.get(&task_id))
            .cloned()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn get_task(&self, account: &AccountId, task_id: TaskId) -> Result<Option<Task>> {
        Ok(self.task(account, task_id))
    }

    async fn increment_completed_pomodoros(
        &self,
        account: &AccountId,
        task_id: TaskId,
    ) -> Result<()> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(account)
            .and_then(|tasks| tasks.get_mut(&task_id))
            .ok_or_else(|| Error::internal(format!("task {task_id} not found")))?;
        task.completed_pomodoros += 1;
        Ok(())
    }
}

/// In-memory settings store with per-account preset tables.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    presets: RwLock<HashMap<AccountId, PresetTable>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get_presets(&self, account: &AccountId) -> Result<PresetTable> {
        Ok(self
            .presets
            .read()
            .get(account)
            .copied()
            .unwrap_or_default())
    }

    async fn put_presets(&self, account: &AccountId, presets: PresetTable) -> Result<()> {
        presets.check()?;
        self.presets.write().insert(account.clone(), presets);
        Ok(())
    }
}

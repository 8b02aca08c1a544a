//! The account registry and command application path.
//!
//! The server is the single writer of timer state. A command is applied
//! while the account's timer mutex is held, and the resulting broadcasts are
//! emitted before the mutex is released, so the `timer_sync` sequence seen
//! by every connection reflects one total order of applied commands.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use sync_protocol::{ClientMessage, ServerMessage, TimerSyncData};
use telemetry::metrics;
use timer_core::{
    AccountId, PhaseTransition, PresetKind, Result, SessionTimer, SettingsStore, Task,
    TaskStore, TimerState,
};

/// Broadcast buffer per account. Slow receivers that fall this far behind
/// skip ahead; the next `timer_sync` restores them.
const BROADCAST_BUFFER: usize = 64;

/// One account's authoritative timer plus its connection fan-out.
pub struct AccountHandle {
    account: AccountId,
    timer: Mutex<SessionTimer>,
    tx: broadcast::Sender<ServerMessage>,
    connections: AtomicUsize,
}

impl AccountHandle {
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Subscribe a connection to this account's broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    fn send(&self, message: ServerMessage) {
        // no receivers is fine: the timer keeps running with nobody watching
        let _ = self.tx.send(message);
    }
}

/// Registry of account timers. Timers are created lazily on first
/// connection and persist across reconnects; nothing here deletes them.
pub struct Hub {
    accounts: parking_lot::RwLock<HashMap<AccountId, Arc<AccountHandle>>>,
    tasks: Arc<dyn TaskStore>,
    settings: Arc<dyn SettingsStore>,
}

impl Hub {
    pub fn new(tasks: Arc<dyn TaskStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            accounts: parking_lot::RwLock::new(HashMap::new()),
            tasks,
            settings,
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn connection_count(&self) -> usize {
        self.accounts
            .read()
            .values()
            .map(|handle| handle.connection_count())
            .sum()
    }

    /// Attach a connection to an account, creating the timer lazily on the
    /// first connection. The preset hint (from the client's initial
    /// `sync_request`) only applies to a freshly created timer.
    pub async fn attach(
        &self,
        account: &AccountId,
        preset_hint: Option<PresetKind>,
    ) -> Result<Arc<AccountHandle>> {
        if let Some(handle) = self.accounts.read().get(account).cloned() {
            handle.connections.fetch_add(1, Ordering::Relaxed);
            return Ok(handle);
        }

        // presets come from the settings collaborator; fetched outside the
        // map lock
        let presets = self.settings.get_presets(account).await?;
        let preset_type = preset_hint.unwrap_or_default();

        let mut accounts = self.accounts.write();
        let handle = accounts
            .entry(account.clone())
            .or_insert_with(|| {
                info!(account = %account, "Creating session timer");
                let (tx, _) = broadcast::channel(BROADCAST_BUFFER);
                Arc::new(AccountHandle {
                    account: account.clone(),
                    timer: Mutex::new(SessionTimer::new(presets, preset_type, Utc::now())),
                    tx,
                    connections: AtomicUsize::new(0),
                })
            })
            .clone();
        handle.connections.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Detach a connection. The account's timer is untouched; closing a
    /// connection never cancels or mutates authoritative state.
    pub fn detach(&self, handle: &AccountHandle) {
        handle.connections.fetch_sub(1, Ordering::Relaxed);
        debug!(
            account = %handle.account,
            remaining = handle.connection_count(),
            "Connection detached"
        );
    }

    /// Apply one client command against the account's timer and broadcast
    /// the resulting state to all of its connections.
    ///
    /// Rejections are returned to the caller (the issuing connection shows
    /// them); they never mutate state and never tear down the connection.
    pub async fn handle_message(
        &self,
        handle: &AccountHandle,
        message: ClientMessage,
    ) -> Result<()> {
        let kind = message.kind();
        let mut timer = handle.timer.lock().await;
        let now = Utc::now();

        // settle the wall clock first so a phase that ran out while nobody
        // was polling completes before the command is judged
        if let Some(transition) = timer.tick(now) {
            self.finish_phase(handle, &transition).await;
            handle.send(ServerMessage::SessionEnded);
        }

        match message {
            ClientMessage::Start {
                task_id,
                session_type,
                duration,
                preset_type,
            } => {
                if let Some(task_id) = task_id {
                    if self.tasks.get_task(&handle.account, task_id).await?.is_none() {
                        return Err(timer_core::Error::invalid_command(format!(
                            "unknown task {task_id}"
                        )));
                    }
                }
                timer.start(task_id, session_type, duration, preset_type, now)?;
                handle.send(ServerMessage::SessionStarted);
            }
            ClientMessage::Pause => {
                if let Some(transition) = timer.pause(now)? {
                    self.finish_phase(handle, &transition).await;
                    handle.send(ServerMessage::SessionEnded);
                } else {
                    handle.send(ServerMessage::SessionPaused);
                }
            }
            ClientMessage::Resume => {
                timer.resume(now)?;
            }
            ClientMessage::Stop => {
                timer.stop(now);
                handle.send(ServerMessage::TimerStopped);
            }
            ClientMessage::SkipToNext => {
                let transition = timer.skip_to_next(now)?;
                // skip never counts work progress
                debug!(
                    account = %handle.account,
                    from = transition.from.as_str(),
                    to = transition.to.as_str(),
                    "Skipped to next phase"
                );
                handle.send(ServerMessage::SessionEnded);
            }
            ClientMessage::ResetRounds => {
                timer.reset_rounds(now);
                handle.send(ServerMessage::RoundsReset);
            }
            ClientMessage::SyncRequest { preset_type } => {
                // an idle timer may still adopt the client's preset hint
                if let Some(hint) = preset_type {
                    if timer.state() == TimerState::Idle && timer.preset_type() != hint {
                        timer.change_preset(hint, now);
                    }
                }
            }
            ClientMessage::ChangePreset { preset_type } => {
                timer.change_preset(preset_type, now);
            }
        }

        debug!(account = %handle.account, command = kind, "Command applied");
        self.broadcast_sync(handle, &timer).await;
        Ok(())
    }

    /// Push the current authoritative state of every account that is
    /// counting down, firing completions for phases that ran out. Driven by
    /// the scheduler at the tick interval.
    pub async fn tick_all(&self) {
        let handles: Vec<Arc<AccountHandle>> =
            self.accounts.read().values().cloned().collect();

        for handle in handles {
            let mut timer = handle.timer.lock().await;
            let now = Utc::now();
            let was_running = timer.state() == TimerState::Running;
            if let Some(transition) = timer.tick(now) {
                self.finish_phase(&handle, &transition).await;
                handle.send(ServerMessage::SessionEnded);
                self.broadcast_sync(&handle, &timer).await;
            } else if was_running {
                self.broadcast_sync(&handle, &timer).await;
            }
        }
    }

    /// Record a finished phase: task progress is incremented exactly once
    /// per naturally completed work session, never on skip or break end.
    async fn finish_phase(&self, handle: &AccountHandle, transition: &PhaseTransition) {
        info!(
            account = %handle.account,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            natural = transition.natural,
            "Phase complete"
        );
        metrics().phases_completed.inc();
        if let (true, Some(task_id)) = (transition.counts_work_session(), transition.task_id) {
            metrics().work_sessions_completed.inc();
            if let Err(err) = self
                .tasks
                .increment_completed_pomodoros(&handle.account, task_id)
                .await
            {
                // progress bookkeeping must never take the timer down
                error!(account = %handle.account, task_id, error = %err, "Failed to record task progress");
            }
        }
    }

    /// Broadcast a `timer_sync` snapshot to every connection of the
    /// account. Called with the timer mutex held to preserve ordering.
    async fn broadcast_sync(&self, handle: &AccountHandle, timer: &SessionTimer) {
        let snapshot = timer.snapshot(Utc::now());
        let active_task = match snapshot.task_id {
            Some(task_id) => self.resolve_task(&handle.account, task_id).await,
            None => None,
        };
        handle.send(ServerMessage::TimerSync {
            data: TimerSyncData::from_snapshot(snapshot, active_task),
        });
        metrics().syncs_broadcast.inc();
    }

    async fn resolve_task(&self, account: &AccountId, task_id: i64) -> Option<Task> {
        match self.tasks.get_task(account, task_id).await {
            Ok(task) => task,
            Err(err) => {
                warn!(account = %account, task_id, error = %err, "Failed to resolve active task");
                None
            }
        }
    }
}

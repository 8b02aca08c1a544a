//! The authoritative session state machine.
//!
//! One `SessionTimer` exists per account on the server; every connected
//! client converges to it. All mutators take an explicit `now` so elapsed
//! time is derived from the wall clock (not tick counts) and the invariants
//! stay unit-testable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::limits::MAX_PHASE_MINUTES;
use crate::preset::{PresetKind, PresetTable};
use crate::task::TaskId;

/// One timed phase kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::ShortBreak => "short_break",
            Self::LongBreak => "long_break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Self::Work)
    }
}

/// Machine state of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// No active countdown (never started, or stopped).
    Idle,
    /// Counting down at wall-clock rate.
    Running,
    /// Explicitly paused mid-phase.
    Paused,
    /// A phase transition fired; the next phase is loaded at full duration
    /// and waits for `start` or another skip.
    Completed,
}

/// Outcome of the phase-transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: SessionType,
    pub to: SessionType,
    /// True when the phase ran down to zero, false on skip.
    pub natural: bool,
    /// Task that was active when the phase ended.
    pub task_id: Option<TaskId>,
}

impl PhaseTransition {
    /// Whether this transition counts as one completed work session for
    /// task progress. Skips and break completions never count.
    pub fn counts_work_session(&self) -> bool {
        self.natural && self.from == SessionType::Work && self.task_id.is_some()
    }
}

/// Point-in-time view of a timer, safe to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub task_id: Option<TaskId>,
    pub session_type: SessionType,
    /// Whole seconds left in the current phase.
    pub remaining_time: u64,
    pub is_paused: bool,
    pub round_number: u32,
    pub preset_type: PresetKind,
}

/// Server-authoritative timer state for one account.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    state: TimerState,
    session_type: SessionType,
    /// Seconds left, fractional so sub-second ticks do not drift.
    remaining: f64,
    round_number: u32,
    active_task_id: Option<TaskId>,
    preset_type: PresetKind,
    presets: PresetTable,
    last_tick: DateTime<Utc>,
}

impl SessionTimer {
    /// Create an idle timer loaded with the preset's work duration.
    pub fn new(presets: PresetTable, preset_type: PresetKind, now: DateTime<Utc>) -> Self {
        let remaining = presets.get(preset_type).duration_secs(SessionType::Work) as f64;
        Self {
            state: TimerState::Idle,
            session_type: SessionType::Work,
            remaining,
            round_number: 1,
            active_task_id: None,
            preset_type,
            presets,
            last_tick: now,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn preset_type(&self) -> PresetKind {
        self.preset_type
    }

    pub fn active_task_id(&self) -> Option<TaskId> {
        self.active_task_id
    }

    /// A timer only counts down while `Running`.
    pub fn is_paused(&self) -> bool {
        self.state != TimerState::Running
    }

    fn current_preset(&self) -> &crate::preset::Preset {
        self.presets.get(self.preset_type)
    }

    /// Begin a phase. Valid from `Idle` and `Completed`.
    ///
    /// A work session without a resolvable task is rejected; breaks may run
    /// with or without one.
    pub fn start(
        &mut self,
        task_id: Option<TaskId>,
        session_type: SessionType,
        duration_secs: u64,
        preset_type: PresetKind,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !matches!(self.state, TimerState::Idle | TimerState::Completed) {
            return Err(Error::invalid_command(format!(
                "start is not valid while {:?}",
                self.state
            )));
        }
        if session_type == SessionType::Work && task_id.is_none() {
            return Err(Error::invalid_command(
                "a work session requires an active task",
            ));
        }
        if duration_secs == 0 || duration_secs > u64::from(MAX_PHASE_MINUTES) * 60 {
            return Err(Error::invalid_command(format!(
                "duration {duration_secs}s is out of range"
            )));
        }

        self.session_type = session_type;
        self.remaining = duration_secs as f64;
        self.active_task_id = task_id;
        self.preset_type = preset_type;
        self.last_tick = now;
        self.state = TimerState::Running;
        Ok(())
    }

    /// Freeze the countdown at its current wall-clock-derived value.
    ///
    /// If the phase already ran out by the time the pause arrives, the
    /// completion fires instead and the transition is reported.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Option<PhaseTransition>> {
        if self.state != TimerState::Running {
            return Err(Error::invalid_command(format!(
                "pause is not valid while {:?}",
                self.state
            )));
        }
        if self.settle(now) {
            return Ok(Some(self.advance_phase(true, now)));
        }
        self.state = TimerState::Paused;
        Ok(None)
    }

    /// Continue a paused countdown. The tick reference resets to now.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state != TimerState::Paused {
            return Err(Error::invalid_command(format!(
                "resume is not valid while {:?}",
                self.state
            )));
        }
        self.last_tick = now;
        self.state = TimerState::Running;
        Ok(())
    }

    /// Wall-clock evaluation. Subtracts elapsed time since the last tick;
    /// two ticks with no elapsed time change nothing. Reaching zero while
    /// running fires the phase-transition rule exactly once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<PhaseTransition> {
        if self.state != TimerState::Running {
            return None;
        }
        if self.settle(now) {
            return Some(self.advance_phase(true, now));
        }
        None
    }

    /// Apply elapsed wall-clock time to `remaining`. Returns true when the
    /// countdown just hit zero.
    fn settle(&mut self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.last_tick).num_milliseconds().max(0) as f64 / 1000.0;
        self.last_tick = now;
        if elapsed <= 0.0 {
            return self.remaining <= 0.0;
        }
        self.remaining = (self.remaining - elapsed).max(0.0);
        self.remaining <= 0.0
    }

    /// Force an immediate phase transition, regardless of remaining time.
    /// Valid from `Running`, `Paused`, and `Completed`.
    pub fn skip_to_next(&mut self, now: DateTime<Utc>) -> Result<PhaseTransition> {
        if self.state == TimerState::Idle {
            return Err(Error::invalid_command("skip_to_next is not valid while Idle"));
        }
        Ok(self.advance_phase(false, now))
    }

    /// Halt the countdown: back to an idle work phase at the preset's work
    /// duration. The round counter is untouched (`reset_rounds` is the
    /// operation that clears it).
    pub fn stop(&mut self, now: DateTime<Utc>) {
        self.state = TimerState::Idle;
        self.session_type = SessionType::Work;
        self.remaining = self.current_preset().duration_secs(SessionType::Work) as f64;
        self.active_task_id = None;
        self.last_tick = now;
    }

    /// Start the cycle over: round 1, idle work phase.
    pub fn reset_rounds(&mut self, now: DateTime<Utc>) {
        self.round_number = 1;
        self.state = TimerState::Idle;
        self.session_type = SessionType::Work;
        self.remaining = self.current_preset().duration_secs(SessionType::Work) as f64;
        self.last_tick = now;
    }

    /// Switch presets and reload the current phase's duration from the new
    /// table. Machine state, session type, and round are unchanged.
    pub fn change_preset(&mut self, kind: PresetKind, now: DateTime<Utc>) {
        self.preset_type = kind;
        self.remaining = self.presets.get(kind).duration_secs(self.session_type) as f64;
        self.last_tick = now;
    }

    /// The phase-transition rule, shared by natural completion and skip.
    ///
    /// Ending work: long break iff the round is a multiple of the cadence,
    /// else short break. Ending a short break: back to work, round + 1.
    /// Ending a long break: back to work, round 1.
    fn advance_phase(&mut self, natural: bool, now: DateTime<Utc>) -> PhaseTransition {
        let from = self.session_type;
        let task_id = self.active_task_id;
        let cadence = self.current_preset().sessions_before_long_break;

        let to = match from {
            SessionType::Work => {
                if self.round_number % cadence == 0 {
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak => {
                self.round_number += 1;
                SessionType::Work
            }
            SessionType::LongBreak => {
                self.round_number = 1;
                SessionType::Work
            }
        };

        self.session_type = to;
        self.remaining = self.current_preset().duration_secs(to) as f64;
        self.last_tick = now;
        self.state = TimerState::Completed;

        PhaseTransition {
            from,
            to,
            natural,
            task_id,
        }
    }

    /// Read-only view with the wall-clock-predicted remaining time. Does
    /// not mutate; completion firing is `tick`'s job.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        let remaining = if self.state == TimerState::Running {
            let elapsed = (now - self.last_tick).num_milliseconds().max(0) as f64 / 1000.0;
            (self.remaining - elapsed).max(0.0)
        } else {
            self.remaining
        };
        TimerSnapshot {
            task_id: self.active_task_id,
            session_type: self.session_type,
            remaining_time: remaining.round() as u64,
            is_paused: self.is_paused(),
            round_number: self.round_number,
            preset_type: self.preset_type,
        }
    }
}

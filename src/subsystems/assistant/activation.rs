//! Wake-phrase gate.
//!
//! Two states.  While inactive only the wake word gets through; once active
//! everything is routed.  Leaving the active state is always deferred: the
//! engine schedules a timer and hands its id to [`Activation::defer_deactivation`],
//! and the state flips only when that same timer fires.

use crate::subsystems::timer::ScheduleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Active,
}

/// What to do with one normalized utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Wake word heard while inactive; now active.  Acknowledge.
    Wake,
    /// Inactive and no wake word.  Prompt; do not route.
    Prompt,
    /// Active; hand to the router.
    Route,
}

#[derive(Debug)]
pub struct Activation {
    state: ActivationState,
    wake_word: String,
    pending: Option<ScheduleId>,
}

impl Activation {
    pub fn new(wake_word: &str) -> Self {
        Self {
            state: ActivationState::Inactive,
            wake_word: wake_word.trim().to_lowercase(),
            pending: None,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    pub fn gate(&mut self, normalized: &str) -> Gate {
        match self.state {
            ActivationState::Active => Gate::Route,
            ActivationState::Inactive if normalized.contains(&self.wake_word) => {
                self.state = ActivationState::Active;
                Gate::Wake
            }
            ActivationState::Inactive => Gate::Prompt,
        }
    }

    /// Record `id` as the one pending deactivation.  Returns the previous one,
    /// which the caller must cancel.
    pub fn defer_deactivation(&mut self, id: ScheduleId) -> Option<ScheduleId> {
        self.pending.replace(id)
    }

    /// A deactivation timer fired.  Only the currently pending id counts;
    /// returns whether the state changed.
    pub fn complete_deactivation(&mut self, id: &ScheduleId) -> bool {
        if self.pending.as_ref() != Some(id) {
            return false;
        }
        self.pending = None;
        let was_active = self.is_active();
        self.state = ActivationState::Inactive;
        was_active
    }

    /// Force inactive.  Returns the pending timer, which the caller cancels.
    pub fn teardown(&mut self) -> Option<ScheduleId> {
        self.state = ActivationState::Inactive;
        self.pending.take()
    }
}

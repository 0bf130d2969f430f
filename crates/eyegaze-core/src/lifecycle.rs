//! Session lifecycle: Idle -> Created -> Running -> Destroyed.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Created,
    Running,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session cannot go from {from:?} to {to:?}")]
pub struct LifecycleError {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

/// Phase tracker for one session.
///
/// `Running` is entered on the first begun frame; the tracker is started in
/// `Created` and stopped on `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifecycle {
    phase: SessionPhase,
    frames_begun: u64,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            frames_begun: 0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub const fn frames_begun(&self) -> u64 {
        self.frames_begun
    }

    fn advance(&mut self, allowed: &[SessionPhase], to: SessionPhase) -> Result<(), LifecycleError> {
        if allowed.contains(&self.phase) {
            self.phase = to;
            Ok(())
        } else {
            Err(LifecycleError {
                from: self.phase,
                to,
            })
        }
    }

    pub fn created(&mut self) -> Result<(), LifecycleError> {
        self.advance(&[SessionPhase::Idle], SessionPhase::Created)
    }

    /// Record a begun frame; the first one moves the session to `Running`.
    pub fn frame_begun(&mut self) -> Result<(), LifecycleError> {
        self.advance(
            &[SessionPhase::Created, SessionPhase::Running],
            SessionPhase::Running,
        )?;
        self.frames_begun += 1;
        Ok(())
    }

    /// Destroying an already destroyed session is accepted.
    pub fn destroyed(&mut self) -> Result<(), LifecycleError> {
        self.advance(
            &[
                SessionPhase::Created,
                SessionPhase::Running,
                SessionPhase::Destroyed,
            ],
            SessionPhase::Destroyed,
        )
    }

    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.phase, SessionPhase::Created | SessionPhase::Running)
    }
}

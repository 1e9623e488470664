use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

/// Discrete state of a play-through. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    NotStarted,
    Intro,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

/// Notification produced by a state change or a countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Intro,
    Started,
    Countdown { remaining: u64 },
    Succeeded { elapsed: Duration },
    Failed,
}

/// Countdown state machine for a single play-through.
///
/// Timestamps are offsets from any monotonic origin chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimer {
    phase: Phase,
    duration: Duration,
    started_at: Option<Duration>,
    finished_at: Option<Duration>,
}

impl SessionTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            phase: Phase::NotStarted,
            duration,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Duration> {
        self.finished_at
    }

    /// World geometry finished loading.
    pub fn assets_ready(&mut self) -> Option<SessionEvent> {
        if self.phase != Phase::NotStarted {
            return None;
        }
        self.phase = Phase::Intro;
        info!("assets ready, waiting for the player to engage");
        Some(SessionEvent::Intro)
    }

    /// First engage trigger after the intro: the countdown starts at `now`.
    pub fn engage(&mut self, now: Duration) -> Option<SessionEvent> {
        if self.phase != Phase::Intro {
            return None;
        }
        self.phase = Phase::Running;
        self.started_at = Some(now);
        info!("session started, {}s on the clock", self.duration.as_secs());
        Some(SessionEvent::Started)
    }

    /// Time since the countdown started, frozen once the session finished.
    pub fn elapsed(&self, now: Duration) -> Duration {
        let Some(start) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.finished_at.unwrap_or(now);
        end.saturating_sub(start)
    }

    /// Seconds left on the clock, never negative.
    pub fn remaining(&self, now: Duration) -> u64 {
        self.duration
            .as_secs()
            .saturating_sub(self.elapsed(now).as_secs())
    }

    /// Periodic countdown update. Fails the session when time runs out.
    pub fn tick(&mut self, now: Duration) -> Option<SessionEvent> {
        if self.phase != Phase::Running {
            return None;
        }
        let remaining = self.remaining(now);
        if remaining > 0 {
            return Some(SessionEvent::Countdown { remaining });
        }
        self.phase = Phase::Failed;
        self.finished_at = Some(now);
        info!("time is up, session failed");
        Some(SessionEvent::Failed)
    }

    /// The target was located. Repeated calls are absorbed.
    pub fn succeed(&mut self, now: Duration) -> Option<SessionEvent> {
        if self.phase != Phase::Running {
            return None;
        }
        self.phase = Phase::Succeeded;
        self.finished_at = Some(now);
        let elapsed = self.elapsed(now);
        info!("target located after {}s", elapsed.as_secs());
        Some(SessionEvent::Succeeded { elapsed })
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

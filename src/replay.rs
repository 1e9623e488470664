//! Headless sessions driven by a timed input script.
//!
//! A script is one event per line, prefixed by the time in seconds at which it
//! is delivered:
//!
//! ```text
//! # engage, walk forward for half a second, then look left and click
//! 0.5  click
//! 1.0  down W
//! 1.5  up W
//! 2.0  look -100 0
//! 2.1  click
//! 70   end
//! ```

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use log::{debug, info};

use crate::game::{GameState, TriggerOutcome};
use crate::hud::format_clock;
use crate::input::{InputEvent, KeyCode};
use crate::movement::MoveOutcome;
use crate::session::Phase;

/// One scripted action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptAction {
    Input(InputEvent),
    /// Stop the replay.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub at: Duration,
    pub action: ScriptAction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self> {
        let mut steps: Vec<ScriptStep> = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let step = parse_step(line).with_context(|| format!("line {}: `{line}`", index + 1))?;
            if let Some(previous) = steps.last() {
                if step.at < previous.at {
                    bail!(
                        "line {}: time {:.3}s is earlier than the previous step",
                        index + 1,
                        step.at.as_secs_f64()
                    );
                }
            }
            steps.push(step);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Time of the first `end` step, if any.
    pub fn end_time(&self) -> Option<Duration> {
        self.steps
            .iter()
            .find(|step| step.action == ScriptAction::End)
            .map(|step| step.at)
    }

    fn last_time(&self) -> Duration {
        self.steps.last().map(|step| step.at).unwrap_or_default()
    }
}

fn parse_step(line: &str) -> Result<ScriptStep> {
    let mut parts = line.split_whitespace();
    let time = parts.next().ok_or_else(|| anyhow!("missing time"))?;
    let seconds: f64 = time
        .parse()
        .with_context(|| format!("invalid time `{time}`"))?;
    let at = Duration::try_from_secs_f64(seconds)
        .map_err(|_| anyhow!("time must be a non-negative number of seconds"))?;
    let verb = parts.next().ok_or_else(|| anyhow!("missing action"))?;
    let action = match verb {
        "down" | "up" => {
            let name = parts
                .next()
                .ok_or_else(|| anyhow!("`{verb}` needs a key name"))?;
            let key = KeyCode::from_name(name).ok_or_else(|| anyhow!("unknown key `{name}`"))?;
            ScriptAction::Input(if verb == "down" {
                InputEvent::KeyDown(key)
            } else {
                InputEvent::KeyUp(key)
            })
        }
        "click" => ScriptAction::Input(InputEvent::Trigger),
        "look" => {
            let dx = parse_delta(parts.next(), "dx")?;
            let dy = parse_delta(parts.next(), "dy")?;
            ScriptAction::Input(InputEvent::Look { dx, dy })
        }
        "end" => ScriptAction::End,
        other => bail!("unknown action `{other}`"),
    };
    if let Some(extra) = parts.next() {
        bail!("unexpected `{extra}` after `{verb}`");
    }
    Ok(ScriptStep { at, action })
}

fn parse_delta(value: Option<&str>, name: &str) -> Result<f32> {
    let value = value.ok_or_else(|| anyhow!("`look` needs {name}"))?;
    let delta: f32 = value
        .parse()
        .with_context(|| format!("invalid {name} `{value}`"))?;
    if !delta.is_finite() {
        bail!("{name} must be finite");
    }
    Ok(delta)
}

/// Simulated clock settings for a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Spacing between simulated animation frames.
    pub frame_period: Duration,
    /// Extra time simulated after the last step when the script has no `end`.
    pub grace: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            frame_period: Duration::from_micros(16_667),
            grace: Duration::from_secs(1),
        }
    }
}

/// Summary of a finished replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub phase: Phase,
    pub remaining: u64,
    pub position: Vec3,
    pub ended_at: Duration,
    pub frames: u32,
    pub blocked_moves: u32,
    pub hits: u32,
    pub misses: u32,
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Phase: {:?}", self.phase)?;
        writeln!(f, "Time left: {}", format_clock(self.remaining))?;
        writeln!(
            f,
            "Position: ({:.2}, {:.2}, {:.2})",
            self.position.x, self.position.y, self.position.z
        )?;
        writeln!(
            f,
            "Frames: {} ({} blocked), picks: {} hit / {} missed",
            self.frames, self.blocked_moves, self.hits, self.misses
        )?;
        write!(f, "Stopped at {:.2}s", self.ended_at.as_secs_f64())
    }
}

/// Runs `script` against `game` on a simulated clock starting at zero.
///
/// Frames advance at `frame_period` and the countdown polls its own 1 Hz
/// schedule. Without an `end` step the run stops once the session is over,
/// or after the last step plus the session length and `grace`.
pub fn run(game: &mut GameState, script: &Script, options: &ReplayOptions) -> ReplayReport {
    let period = options.frame_period.max(Duration::from_micros(1));
    let scripted_end = script.end_time().is_some();
    let horizon = script.end_time().unwrap_or_else(|| {
        script
            .last_time()
            .saturating_add(game.session().duration())
            .saturating_add(options.grace)
    });
    let mut report = ReplayReport {
        phase: game.phase(),
        remaining: game.remaining(Duration::ZERO),
        position: game.player().position,
        ended_at: Duration::ZERO,
        frames: 0,
        blocked_moves: 0,
        hits: 0,
        misses: 0,
    };

    let mut pending = script.steps().iter().peekable();
    let mut now = Duration::ZERO;
    loop {
        while let Some(step) = pending.next_if(|step| step.at <= now) {
            match step.action {
                ScriptAction::End => {
                    debug!("script ended at {:.3}s", step.at.as_secs_f64());
                    return finish(game, report, now);
                }
                ScriptAction::Input(event) => match game.handle_input(event, now) {
                    Some(TriggerOutcome::Hit) => report.hits += 1,
                    Some(TriggerOutcome::Miss) => report.misses += 1,
                    _ => {}
                },
            }
        }

        game.poll_countdown(now);
        match game.frame(now) {
            Some(MoveOutcome::Blocked) => {
                report.frames += 1;
                report.blocked_moves += 1;
            }
            Some(_) => report.frames += 1,
            None => {}
        }

        if now >= horizon || (!scripted_end && game.phase().is_terminal()) {
            return finish(game, report, now);
        }
        now += period;
    }
}

fn finish(game: &GameState, mut report: ReplayReport, now: Duration) -> ReplayReport {
    report.phase = game.phase();
    report.remaining = game.remaining(now);
    report.position = game.player().position;
    report.ended_at = now;
    info!(
        "replay finished in phase {:?} at {:.2}s",
        report.phase,
        now.as_secs_f64()
    );
    report
}

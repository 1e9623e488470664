use std::sync::Arc;

use parking_lot::RwLock;

use crate::session::Phase;

/// Text surface the game writes its countdown, banners and status to.
pub trait HudSurface {
    fn show_countdown(&mut self, text: &str);
    fn show_phase(&mut self, phase: Phase);
    fn show_status(&mut self, message: &str);
}

/// Formats whole seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Banner shown for a phase, if that phase has one.
pub fn banner_text(phase: Phase) -> Option<&'static str> {
    match phase {
        Phase::Succeeded => Some("SUCCESS!"),
        Phase::Failed => Some("FAILED!"),
        _ => None,
    }
}

/// Last values written to the display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HudText {
    pub countdown: Option<String>,
    pub banner: Option<String>,
    pub status: Option<String>,
    pub phase: Option<Phase>,
}

/// Shareable in-memory display, readable while the game owns a handle to it.
#[derive(Debug, Clone, Default)]
pub struct SharedHud {
    text: Arc<RwLock<HudText>>,
}

impl SharedHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HudText {
        self.text.read().clone()
    }
}

impl HudSurface for SharedHud {
    fn show_countdown(&mut self, text: &str) {
        self.text.write().countdown = Some(text.to_string());
    }

    fn show_phase(&mut self, phase: Phase) {
        let mut text = self.text.write();
        text.phase = Some(phase);
        if let Some(banner) = banner_text(phase) {
            text.banner = Some(banner.to_string());
        }
    }

    fn show_status(&mut self, message: &str) {
        self.text.write().status = Some(message.to_string());
    }
}

use log::debug;

/// Exclusive pointer/view capture provided by the platform.
///
/// `release` must be safe to call when capture was never acquired.
pub trait CaptureMode {
    /// Requests capture. Platforms may grant it later or not at all.
    fn acquire(&mut self);
    fn release(&mut self);
    fn is_active(&self) -> bool;
}

/// Capture that is granted immediately, for headless runs and tests.
#[derive(Debug, Default, Clone)]
pub struct SoftCapture {
    active: bool,
    acquisitions: u32,
}

impl SoftCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times capture went from inactive to active.
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions
    }
}

impl CaptureMode for SoftCapture {
    fn acquire(&mut self) {
        if !self.active {
            self.active = true;
            self.acquisitions += 1;
            debug!("capture acquired");
        }
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            debug!("capture released");
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

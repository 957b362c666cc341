//! Accelerating seek-step selection for the progress-bar focus zone.

use std::time::Instant;

use crate::constants::{SEEK_ACCEL_WINDOW, SEEK_STEPS_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Back,
    Forward,
}

impl SeekDirection {
    fn signum(&self) -> f64 {
        match self {
            SeekDirection::Back => -1.0,
            SeekDirection::Forward => 1.0,
        }
    }
}

/// Step escalation driven by press cadence: each same-direction press within
/// the window advances one step; a direction change or a longer gap resets.
#[derive(Debug, Default)]
pub struct SeekAccel {
    last: Option<(SeekDirection, Instant)>,
    step: usize,
}

impl SeekAccel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a press and returns the signed seek delta in seconds.
    pub fn press(&mut self, direction: SeekDirection, now: Instant) -> f64 {
        match self.last {
            Some((prev, at))
                if prev == direction && now.duration_since(at) <= SEEK_ACCEL_WINDOW =>
            {
                self.step = (self.step + 1).min(SEEK_STEPS_SECS.len() - 1);
            }
            _ => self.step = 0,
        }
        self.last = Some((direction, now));
        SEEK_STEPS_SECS[self.step] * direction.signum()
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.step = 0;
    }
}

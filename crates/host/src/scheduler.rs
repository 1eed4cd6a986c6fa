//! Real-time frame pacing
//!
//! Sleeps only have millisecond granularity while a frame lasts ~16.74 ms, so
//! the fractional part of every requested delay is carried in `compensation`
//! and paid back on later frames. Oversleeping is folded back in the same way.

use emu_core::VERTICAL_SYNC;

use crate::clock::Clock;

pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 8;

/// Virtual milliseconds per RTC tick
const RTC_PERIOD_MS: f64 = 1000.0;

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    target_ms: f64,
    compensation: f64,
    rtc_ms: f64,
    speed: u32,
    skip_timer: u32,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(1000.0 / VERTICAL_SYNC)
    }
}

impl FrameScheduler {
    pub fn new(target_ms: f64) -> Self {
        Self {
            target_ms,
            compensation: 0.0,
            rtc_ms: 0.0,
            speed: MIN_SPEED,
            skip_timer: 1,
        }
    }

    pub fn target_ms(&self) -> f64 {
        self.target_ms
    }

    /// Residual timing error carried to the next frame
    pub fn compensation(&self) -> f64 {
        self.compensation
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn speed_up(&mut self) -> u32 {
        self.set_speed(self.speed + 1)
    }

    pub fn slow_down(&mut self) -> u32 {
        self.set_speed(self.speed.saturating_sub(1))
    }

    pub fn set_speed(&mut self, speed: u32) -> u32 {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.skip_timer = self.skip_timer.min(self.speed);
        self.speed
    }

    /// Account one emulated frame of virtual time. Returns true when a full
    /// second has accumulated and the core's RTC must tick.
    pub fn advance_rtc(&mut self) -> bool {
        self.rtc_ms += self.target_ms / self.speed as f64;
        if self.rtc_ms >= RTC_PERIOD_MS {
            self.rtc_ms -= RTC_PERIOD_MS;
            return true;
        }
        false
    }

    /// Frame skip for fast playback: only one of every `speed` frames is
    /// presented and paced.
    pub fn should_present(&mut self) -> bool {
        if self.skip_timer > 1 {
            self.skip_timer -= 1;
            return false;
        }
        self.skip_timer = self.speed;
        true
    }

    /// Sleep off the rest of the frame that started at `frame_start_ms`.
    /// Returns the requested delay; zero when the frame ran late.
    pub fn pace(&mut self, clock: &mut dyn Clock, frame_start_ms: u64) -> u64 {
        let elapsed = clock.now_ms().saturating_sub(frame_start_ms);
        self.compensation += self.target_ms - elapsed as f64;

        let delay = self.compensation.trunc();
        self.compensation -= delay;

        if delay <= 0.0 {
            return 0;
        }

        let delay = delay as u64;
        let before = clock.now_ms();
        clock.sleep_ms(delay);
        let slept = clock.now_ms().saturating_sub(before);

        // Sleeping is "at least" the requested time; repay the overshoot
        self.compensation += delay as f64 - slept as f64;
        delay
    }
}

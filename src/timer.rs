//! Exposure countdown. [Countdown] is a plain state machine that only moves
//! when told to; [Ticker] is what tells it to, once a second.

use log::{debug, trace};
use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

/// Where the countdown is in its life
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Never started
    Idle,
    Running,
    /// Stopped by the user with time left on the clock
    Stopped,
    /// Ran all the way down
    Expired,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TickOutcome {
    /// Not running, nothing happened
    Ignored,
    Counted,
    /// That was the last second
    Expired,
}

/// Result of pressing the single action button
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Toggle {
    Started,
    /// Picked up a stopped countdown where it left off
    Resumed,
    Stopped,
    /// No exposure window, so there's nothing to start
    Rejected,
}

/// One-second resolution countdown. Remaining time only ever goes down while
/// running, and the duration it started with is captured so progress never
/// depends on anything that changed afterward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Countdown {
    remaining_secs: u32,
    initial_secs: u32,
    running: bool,
}

impl Countdown {
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn initial_secs(&self) -> u32 {
        self.initial_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> Phase {
        if self.running {
            Phase::Running
        } else if self.initial_secs == 0 {
            Phase::Idle
        } else if self.remaining_secs == 0 {
            Phase::Expired
        } else {
            Phase::Stopped
        }
    }

    /// Start a fresh countdown of the given length. `None` (no exposure
    /// window) is rejected and leaves everything as it was. Starting while
    /// already running restarts from the top.
    pub fn start(&mut self, minutes: Option<u32>) -> bool {
        let secs = minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .filter(|&secs| secs > 0);
        let Some(secs) = secs else {
            debug!("No exposure window, refusing to start countdown");
            return false;
        };
        debug!("Starting countdown for {secs}s");
        self.initial_secs = secs;
        self.remaining_secs = secs;
        self.running = true;
        true
    }

    /// Count down one second
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        trace!("Countdown tick, {}s remaining", self.remaining_secs);
        if self.remaining_secs == 0 {
            debug!("Countdown expired");
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Counted
        }
    }

    /// Halt the countdown, keeping whatever time is left. Returns whether
    /// anything was actually running.
    pub fn stop(&mut self) -> bool {
        if self.running {
            debug!("Stopping countdown with {}s remaining", self.remaining_secs);
            self.running = false;
            true
        } else {
            false
        }
    }

    /// Continue a stopped countdown from its remaining time. The original
    /// duration is kept, so progress carries on from where it was.
    pub fn resume(&mut self) -> bool {
        if self.phase() != Phase::Stopped {
            return false;
        }
        debug!("Resuming countdown with {}s remaining", self.remaining_secs);
        self.running = true;
        true
    }

    /// Stop if running, resume if stopped, otherwise start fresh
    pub fn toggle(&mut self, minutes: Option<u32>) -> Toggle {
        if self.stop() {
            Toggle::Stopped
        } else if self.resume() {
            Toggle::Resumed
        } else if self.start(minutes) {
            Toggle::Started
        } else {
            Toggle::Rejected
        }
    }

    /// Elapsed share of the countdown, 0-100. Only hits 100 at zero.
    pub fn progress_pct(&self) -> f64 {
        if self.initial_secs == 0 {
            return 0.0;
        }
        let elapsed = self.initial_secs - self.remaining_secs;
        (elapsed as f64 / self.initial_secs as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Remaining time as `m:ss`
    pub fn format_remaining(&self) -> String {
        format!("{}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}

/// Handle to a recurring task that fires on a fixed interval in a background
/// thread. The task stops when the handle is cancelled or dropped, or when
/// the callback returns `false`.
#[derive(Debug)]
pub struct Ticker {
    cancel: Option<Sender<()>>,
}

impl Ticker {
    pub const INTERVAL: Duration = Duration::from_secs(1);

    pub fn spawn(
        interval: Duration,
        mut on_tick: impl 'static + Send + FnMut() -> bool,
    ) -> Self {
        let (cancel, cancelled) = mpsc::channel::<()>();
        thread::spawn(move || {
            // Schedule against a fixed origin so slow callbacks don't drift
            let start = Instant::now();
            let mut ticks: u32 = 0;
            loop {
                let deadline = start + interval * (ticks + 1);
                let wait = deadline.saturating_duration_since(Instant::now());
                match cancelled.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        ticks += 1;
                        if !on_tick() {
                            debug!("Tick receiver is gone, stopping ticker");
                            break;
                        }
                    }
                    // Explicit cancel or the handle was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            trace!("Ticker thread exiting after {ticks} ticks");
        });
        Self {
            cancel: Some(cancel),
        }
    }

    /// Stop firing. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            debug!("Cancelling ticker");
            // Dropping the sender is enough; the send just wakes it sooner
            let _ = cancel.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

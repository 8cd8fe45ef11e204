//! Countdown state machine for a single rest timer

use serde::{Deserialize, Serialize};

use crate::protocol::{MessageType, TimerMessage};

/// Observable timer state published to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub initial_duration: u32,
    pub time_remaining: u32,
    pub is_running: bool,
    pub is_completed: bool,
}

impl TimerSnapshot {
    /// Remaining time as `MM:SS`
    pub fn formatted(&self) -> String {
        format!("{:02}:{:02}", self.time_remaining / 60, self.time_remaining % 60)
    }

    /// Elapsed share of the initial duration, 0.0 to 100.0
    pub fn progress(&self) -> f64 {
        if self.initial_duration == 0 {
            return 100.0;
        }
        let elapsed = self.initial_duration.saturating_sub(self.time_remaining) as f64;
        (elapsed / self.initial_duration as f64 * 100.0).min(100.0)
    }
}

/// What an inbound message did to the local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEffect {
    Ignored,
    Started,
    Paused,
    Reset,
    /// The sender's remaining seconds were taken over
    Adopted(u32),
}

/// Local countdown state. Pure: scheduling, messaging and callbacks live in
/// the controller.
#[derive(Debug, Clone)]
pub struct TimerState {
    initial_duration: u32,
    time_remaining: u32,
    is_running: bool,
    is_completed: bool,
}

impl TimerState {
    pub fn new(initial_duration: u32) -> Self {
        Self {
            initial_duration,
            time_remaining: initial_duration,
            is_running: false,
            is_completed: false,
        }
    }

    pub fn initial_duration(&self) -> u32 {
        self.initial_duration
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Whether the one-second decrement should be scheduled
    pub fn is_ticking(&self) -> bool {
        self.is_running && self.time_remaining > 0
    }

    /// Running with nothing left but not yet marked completed
    pub fn is_due(&self) -> bool {
        self.is_running && self.time_remaining == 0 && !self.is_completed
    }

    /// Begin running. Refused once the timer has completed.
    pub fn start(&mut self) -> bool {
        if self.is_completed {
            return false;
        }
        self.is_running = true;
        true
    }

    pub fn pause(&mut self) {
        self.is_running = false;
    }

    pub fn reset(&mut self) {
        self.time_remaining = self.initial_duration;
        self.is_running = false;
        self.is_completed = false;
    }

    /// Decrement by one second. Returns the new remaining value, or `None` if
    /// the timer is not ticking.
    pub fn tick(&mut self) -> Option<u32> {
        if !self.is_ticking() {
            return None;
        }
        self.time_remaining -= 1;
        Some(self.time_remaining)
    }

    /// Force completion. Returns true only on the transition into completed.
    pub fn complete(&mut self) -> bool {
        self.time_remaining = 0;
        self.is_running = false;
        if self.is_completed {
            return false;
        }
        self.is_completed = true;
        true
    }

    /// Apply a message already known to belong to this timer's session.
    ///
    /// A reset always restores this timer's own initial duration; the sender's
    /// duration is never carried on resets.
    pub fn apply_remote(&mut self, message: &TimerMessage) -> RemoteEffect {
        match message.kind {
            MessageType::TimerStart => {
                if self.start() {
                    RemoteEffect::Started
                } else {
                    RemoteEffect::Ignored
                }
            }
            MessageType::TimerPause => {
                self.pause();
                RemoteEffect::Paused
            }
            MessageType::TimerReset => {
                self.reset();
                RemoteEffect::Reset
            }
            MessageType::TimerUpdate => match message.duration {
                Some(remaining) => {
                    self.time_remaining = remaining;
                    if remaining > 0 {
                        self.is_completed = false;
                    }
                    RemoteEffect::Adopted(remaining)
                }
                None => RemoteEffect::Ignored,
            },
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            initial_duration: self.initial_duration,
            time_remaining: self.time_remaining,
            is_running: self.is_running,
            is_completed: self.is_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(state: &mut TimerState) -> usize {
        let mut completions = 0;
        while let Some(remaining) = state.tick() {
            if remaining == 0 && state.complete() {
                completions += 1;
            }
        }
        completions
    }

    #[test]
    fn counts_down_to_zero_and_completes_once() {
        for initial in [1, 2, 3, 10, 61] {
            let mut state = TimerState::new(initial);
            assert!(state.start());
            assert_eq!(run_to_end(&mut state), 1);
            assert_eq!(state.time_remaining(), 0);
            assert!(state.is_completed());
            assert!(!state.is_running());
            assert_eq!(state.tick(), None);
            assert!(!state.complete());
        }
    }

    #[test]
    fn zero_length_timer_is_due_on_start() {
        let mut state = TimerState::new(0);
        assert!(state.start());
        assert!(state.is_due());
        assert_eq!(state.tick(), None);
        assert!(state.complete());
        assert!(!state.is_due());
    }

    #[test]
    fn reset_restores_initial_duration_from_any_state() {
        let mut state = TimerState::new(45);
        state.start();
        state.tick();
        state.tick();
        state.reset();
        assert_eq!(state.snapshot(), TimerState::new(45).snapshot());

        state.start();
        state.complete();
        state.reset();
        assert_eq!(state.time_remaining(), 45);
        assert!(!state.is_completed());
        assert!(state.start());
    }

    #[test]
    fn pause_keeps_remaining_time() {
        let mut state = TimerState::new(10);
        state.start();
        state.tick();
        state.tick();
        state.pause();
        assert_eq!(state.tick(), None);
        assert_eq!(state.time_remaining(), 8);
        state.start();
        assert_eq!(state.tick(), Some(7));
    }

    #[test]
    fn start_is_refused_after_completion() {
        let mut state = TimerState::new(5);
        assert!(state.complete());
        assert!(!state.start());
        assert!(!state.is_running());
    }

    #[test]
    fn remote_reset_ignores_sender_duration() {
        let mut state = TimerState::new(30);
        state.start();
        state.tick();
        let mut message = TimerMessage::control(MessageType::TimerReset, "abc", "Rows");
        message.duration = Some(90);
        assert_eq!(state.apply_remote(&message), RemoteEffect::Reset);
        assert_eq!(state.time_remaining(), 30);
        assert!(!state.is_running());
    }

    #[test]
    fn remote_start_leaves_remaining_untouched() {
        let mut state = TimerState::new(30);
        let message = TimerMessage::control(MessageType::TimerStart, "abc", "Rows");
        assert_eq!(state.apply_remote(&message), RemoteEffect::Started);
        assert!(state.is_running());
        assert_eq!(state.time_remaining(), 30);
    }

    #[test]
    fn remote_update_adopts_duration() {
        let mut state = TimerState::new(30);
        let update = TimerMessage::update("abc", 17, "Rows");
        assert_eq!(state.apply_remote(&update), RemoteEffect::Adopted(17));
        assert_eq!(state.time_remaining(), 17);

        let mut bare = update.clone();
        bare.duration = None;
        assert_eq!(state.apply_remote(&bare), RemoteEffect::Ignored);
        assert_eq!(state.time_remaining(), 17);
    }

    #[test]
    fn snapshot_formatting() {
        let mut state = TimerState::new(90);
        assert_eq!(state.snapshot().formatted(), "01:30");
        assert_eq!(state.snapshot().progress(), 0.0);
        for _ in 0..45 {
            state.start();
            state.tick();
        }
        assert_eq!(state.snapshot().formatted(), "00:45");
        assert_eq!(state.snapshot().progress(), 50.0);
        assert_eq!(TimerState::new(0).snapshot().progress(), 100.0);
    }
}

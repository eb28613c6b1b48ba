//! Accelerating seek.
//!
//! Repeated same-direction seeks inside the reset window compound the jump
//! distance geometrically; a direction change or a pause longer than the
//! window snaps back to the base amount. Pure state, no player access.

/// Seek direction requested by a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Tuning for one seek invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekParams {
    /// Base jump in seconds.
    pub base_amount: f64,
    /// Multiplier applied per repeat.
    pub factor: f64,
    /// Upper bound on the per-repeat multiplier.
    pub factor_cap: f64,
    /// Gap after which acceleration resets.
    pub reset_window_ms: u64,
}

/// Acceleration bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekState {
    /// Time of the previous seek; `None` before the first one.
    pub last_seek_ms: Option<u64>,
    pub cumulative_factor: f64,
    pub last_direction_was_forward: bool,
}

impl Default for SeekState {
    fn default() -> Self {
        Self {
            last_seek_ms: None,
            cumulative_factor: 1.0,
            last_direction_was_forward: false,
        }
    }
}

/// Stateful seek accelerator.
#[derive(Debug, Default)]
pub struct SeekEngine {
    state: SeekState,
}

impl SeekEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SeekState {
        self.state
    }

    /// Advance the state and return the signed jump in seconds.
    ///
    /// The caller applies it as `seek_to(current_time + delta)`.
    pub fn seek(&mut self, direction: SeekDirection, params: SeekParams, now_ms: u64) -> f64 {
        let forward = direction == SeekDirection::Forward;
        let within_window = self
            .state
            .last_seek_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < params.reset_window_ms);

        if forward != self.state.last_direction_was_forward || !within_window {
            self.state.cumulative_factor = 1.0;
        } else {
            self.state.cumulative_factor *= params.factor.min(params.factor_cap);
        }

        self.state.last_seek_ms = Some(now_ms);
        self.state.last_direction_was_forward = forward;

        let delta = params.base_amount * self.state.cumulative_factor;
        if forward { delta } else { -delta }
    }
}

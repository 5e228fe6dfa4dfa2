//! Acceleration-limited motion smoothing.
//!
//! The crop position and the crop width are each driven through their own
//! [`AccelLimiter`]. The limiter bounds how much the per-frame movement may
//! grow or shrink from one frame to the next, and starts braking early
//! enough that it does not sail past the target.
//!
//! Velocity is signed. When the target swaps sides the value keeps moving
//! the old way while it brakes, and only then heads back, so a reversal is
//! bound by the same deceleration as any other slowdown.

use serde::{Deserialize, Serialize};

/// Position and speed of one smoothed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelState {
    pub position: f64,
    /// Signed pixels moved on the last frame; `None` right after the first
    /// frame.
    pub velocity: Option<f64>,
}

/// Bounded-acceleration limiter for one scalar.
#[derive(Debug, Clone)]
pub struct AccelLimiter {
    max_accel: f64,
    max_decel: f64,
    state: Option<AccelState>,
}

impl AccelLimiter {
    pub fn new(max_accel: f64, max_decel: f64) -> Self {
        Self {
            max_accel,
            max_decel,
            state: None,
        }
    }

    /// Current state; `None` until the first step or after a reset.
    pub fn state(&self) -> Option<AccelState> {
        self.state
    }

    /// Forget position and speed. The next step jumps straight to its target.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Move towards `target` and return the new position.
    pub fn step(&mut self, target: f64) -> f64 {
        let next = match self.state {
            None => AccelState {
                position: target,
                velocity: None,
            },
            Some(AccelState {
                position,
                velocity: None,
            }) => AccelState {
                position: target,
                velocity: Some(target - position),
            },
            Some(AccelState { position, .. }) if target == position => AccelState {
                position: target,
                velocity: Some(0.0),
            },
            Some(AccelState {
                position,
                velocity: Some(velocity),
            }) => self.limited_step(position, velocity, target),
        };
        self.state = Some(next);
        next.position
    }

    fn limited_step(&self, position: f64, velocity: f64, target: f64) -> AccelState {
        let direction = (target - position).signum();
        let attempted = (target - position).abs();
        // Speed towards the target; negative while still moving away from it.
        let speed = velocity * direction;

        let mut allowed = if speed < 0.0 {
            (speed + self.max_decel).min(attempted)
        } else {
            speed + (attempted - speed).clamp(-self.max_decel, self.max_accel)
        };

        // Brake if stopping now takes more frames than the distance left allows.
        if speed >= 0.0 && allowed > 0.0 {
            let frames_to_stop = allowed / self.max_decel;
            let frames_left = attempted / allowed;
            let lands = position + direction * allowed == target;
            if frames_to_stop > frames_left && !lands {
                allowed = (speed - self.max_decel).max(0.0);
            }
        }

        AccelState {
            position: position + direction * allowed,
            velocity: Some(direction * allowed),
        }
    }
}

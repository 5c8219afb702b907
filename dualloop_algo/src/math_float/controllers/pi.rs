// Implements a floating-point PI controller with back-calculation anti-windup, used by both the
// current and the speed loop of the cascade.

// Key Features:
// - Proportional and integral action with forward Euler integration over a fixed sample time.
// - Output clamped symmetrically to a physical limit (bus voltage or stall current).
// - The clamped-off part of the output is fed back into the integrator input on the next tick,
//   so the integral term stops running away while saturated.
// - Every intermediate value is kept for diagnostics.

// Detailed Operation:
//   error        = reference - feedback
//   error_anti   = error - ka * anti_windup
//   integral    += ki * ts * error_anti
//   unsaturated  = integral + kp * error
//   output       = clamp(unsaturated, -limit, +limit)
//   anti_windup  = unsaturated - output

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::params::PiGains;

/// PI controller with output saturation and anti-windup feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct PiController {
    kp: f32,    // Proportional gain.
    ki: f32,    // Integral gain.
    ka: f32,    // Anti-windup gain.
    ts: f32,    // Sample time [s].
    limit: f32, // Symmetric output limit.

    error: f32,       // Last reference - feedback.
    error_anti: f32,  // Error after anti-windup correction.
    integral: f32,    // Integrated error (integral term).
    unsaturated: f32, // Output before clamping.
    output: f32,      // Output after clamping.
    anti_windup: f32, // unsaturated - output.
}

impl PiController {
    /// Creates a new PI controller with all state at zero.
    pub fn new(gains: PiGains, ts: f32, limit: f32) -> Self {
        Self {
            kp: gains.kp,
            ki: gains.ki,
            ka: gains.ka,
            ts,
            limit,
            error: 0.0,
            error_anti: 0.0,
            integral: 0.0,
            unsaturated: 0.0,
            output: 0.0,
            anti_windup: 0.0,
        }
    }

    /// Runs one sample of the controller and returns the saturated output.
    pub fn tick(&mut self, reference: f32, feedback: f32) -> f32 {
        self.error = reference - feedback;

        // Remove the part of the last output that the limit clipped off
        self.error_anti = self.error - self.ka * self.anti_windup;
        self.integral += self.ki * self.ts * self.error_anti;

        self.unsaturated = self.integral + self.kp * self.error;
        self.output = self.unsaturated.clamp(-self.limit, self.limit);

        self.anti_windup = self.unsaturated - self.output;
        self.output
    }

    /// Clears integrator, output and anti-windup feedback.
    pub fn reset(&mut self) {
        *self = Self::new(
            PiGains {
                kp: self.kp,
                ki: self.ki,
                ka: self.ka,
            },
            self.ts,
            self.limit,
        );
    }

    /// Saturated output of the last tick.
    #[inline(always)]
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Output of the last tick before clamping.
    pub fn unsaturated(&self) -> f32 {
        self.unsaturated
    }

    pub fn error(&self) -> f32 {
        self.error
    }

    pub fn error_anti(&self) -> f32 {
        self.error_anti
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Amount clipped by the limit on the last tick, zero when not saturated.
    pub fn anti_windup(&self) -> f32 {
        self.anti_windup
    }

    #[inline(always)]
    pub fn is_saturated(&self) -> bool {
        self.anti_windup != 0.0
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }
}

// Cascaded speed/current control for a DC motor.

// Key Features:
// - Current loop: current reference -> voltage command, saturated to +-Vdc.
// - Speed loop: speed reference -> current reference (saturated to +-Ia_stall), fed straight into
//   the current loop within the same tick.
// - Back-EMF speed estimate shared by both entry points.

// Detailed Operation:
// Both loops share one current PI state, so switching between current and speed control keeps
// the inner integrator continuous. The current-only entry point estimates speed only while a
// non-zero current is commanded; the speed entry point always estimates.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

pub mod current_loop;
pub mod estimator;
pub mod speed_loop;

pub use current_loop::CurrentLoop;
pub use estimator::BackEmfEstimator;
pub use speed_loop::SpeedLoop;

use crate::params::Parameters;

/// Selects which loop the tick engine closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// No control, zero voltage command.
    Idle,
    /// Reference is a current [A].
    Current,
    /// Reference is a speed [rpm].
    Speed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeController {
    current: CurrentLoop,
    speed: SpeedLoop,
    estimator: BackEmfEstimator,
}

impl CascadeController {
    pub fn new(params: &Parameters) -> Self {
        Self {
            current: CurrentLoop::new(params),
            speed: SpeedLoop::new(params),
            estimator: BackEmfEstimator::new(&params.motor),
        }
    }

    /// Runs the current loop alone and returns the voltage command [V].
    ///
    /// The speed estimate uses the previous voltage command and is forced to zero while the
    /// current reference is exactly zero.
    pub fn step_current_loop(&mut self, current_ref: f32, current_sensed: f32) -> f32 {
        if current_ref != 0.0 {
            self.estimator
                .update_speed(self.current.voltage(), current_sensed);
        } else {
            self.estimator.clear_speed();
        }
        self.current.regulate(current_ref, current_sensed)
    }

    /// Runs speed loop then current loop and returns the voltage command [V].
    ///
    /// `voltage` is the command applied during the last tick. Unlike `step_current_loop` the
    /// estimate is refreshed unconditionally, even for a zero speed reference.
    pub fn step_speed_loop(&mut self, speed_ref: f32, current_sensed: f32, voltage: f32) -> f32 {
        self.estimator.update(voltage, current_sensed);

        let current_ref = self.speed.regulate(speed_ref, self.estimator.speed_rpm());
        self.current.regulate(current_ref, current_sensed)
    }

    /// Voltage command of the last tick.
    #[inline(always)]
    pub fn voltage(&self) -> f32 {
        self.current.voltage()
    }

    /// Current reference produced by the speed loop on its last tick.
    #[inline(always)]
    pub fn current_reference(&self) -> f32 {
        self.speed.current_reference()
    }

    pub fn current_loop(&self) -> &CurrentLoop {
        &self.current
    }

    pub fn speed_loop(&self) -> &SpeedLoop {
        &self.speed
    }

    pub fn estimator(&self) -> &BackEmfEstimator {
        &self.estimator
    }

    /// Clears both PI states and the estimator.
    pub fn reset(&mut self) {
        self.current.reset();
        self.speed.reset();
        self.estimator.reset();
    }
}

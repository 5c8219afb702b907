// Outer loop of the cascade: speed error -> current reference, limited to the stall current.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::math_float::controllers::PiController;
use crate::params::Parameters;

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedLoop {
    pi: PiController, // Kps, Kis, Kas; limit +-Ia_stall
}

impl SpeedLoop {
    pub fn new(params: &Parameters) -> Self {
        Self {
            pi: PiController::new(params.speed, params.ts(), params.motor.ia_stall),
        }
    }

    /// Runs the speed PI and returns the saturated current reference [A].
    #[inline(always)]
    pub fn regulate(&mut self, speed_ref: f32, speed_est: f32) -> f32 {
        self.pi.tick(speed_ref, speed_est)
    }

    /// Current reference of the last tick.
    #[inline(always)]
    pub fn current_reference(&self) -> f32 {
        self.pi.output()
    }

    pub fn pi(&self) -> &PiController {
        &self.pi
    }

    pub fn reset(&mut self) {
        self.pi.reset();
    }
}

// Inner loop of the cascade: current error -> armature voltage command, limited to the DC bus.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::math_float::controllers::PiController;
use crate::params::Parameters;

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentLoop {
    pi: PiController, // Kpc, Kic, Kac; limit +-Vdc
}

impl CurrentLoop {
    pub fn new(params: &Parameters) -> Self {
        Self {
            pi: PiController::new(params.current, params.ts(), params.motor.vdc),
        }
    }

    /// Runs the current PI and returns the saturated voltage command [V].
    #[inline(always)]
    pub fn regulate(&mut self, current_ref: f32, current_sensed: f32) -> f32 {
        self.pi.tick(current_ref, current_sensed)
    }

    /// Voltage command of the last tick (V_ref).
    #[inline(always)]
    pub fn voltage(&self) -> f32 {
        self.pi.output()
    }

    pub fn pi(&self) -> &PiController {
        &self.pi
    }

    pub fn reset(&mut self) {
        self.pi.reset();
    }
}

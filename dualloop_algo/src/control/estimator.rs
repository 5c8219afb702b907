// Back-EMF speed estimator: derives the rotor speed from the applied voltage and the sensed
// current instead of a speed sensor.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::params::{MotorParameters, RAD_S_TO_RPM};

#[derive(Debug, Clone, PartialEq)]
pub struct BackEmfEstimator {
    ra: f32,        // Armature resistance [Ohm]
    ke: f32,        // Back-EMF constant [V/(rad/s)]
    speed_rpm: f32, // Wm_esti [rpm]
    v_emf: f32,     // V_emf [V]
}

impl BackEmfEstimator {
    pub fn new(motor: &MotorParameters) -> Self {
        Self {
            ra: motor.ra,
            ke: motor.ke,
            speed_rpm: 0.0,
            v_emf: 0.0,
        }
    }

    /// Updates both the back-EMF voltage and the speed estimate.
    pub fn update(&mut self, voltage: f32, current: f32) {
        self.v_emf = voltage - self.ra * current;
        self.speed_rpm = self.v_emf * RAD_S_TO_RPM / self.ke;
    }

    /// Updates only the speed estimate, leaving the stored back-EMF voltage as is.
    pub fn update_speed(&mut self, voltage: f32, current: f32) {
        self.speed_rpm = (voltage - self.ra * current) * RAD_S_TO_RPM / self.ke;
    }

    pub fn clear_speed(&mut self) {
        self.speed_rpm = 0.0;
    }

    #[inline(always)]
    pub fn speed_rpm(&self) -> f32 {
        self.speed_rpm
    }

    #[inline(always)]
    pub fn v_emf(&self) -> f32 {
        self.v_emf
    }

    pub fn reset(&mut self) {
        self.speed_rpm = 0.0;
        self.v_emf = 0.0;
    }
}

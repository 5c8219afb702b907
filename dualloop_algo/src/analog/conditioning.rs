// Converts the raw current sense sample into a physical current every tick.
//
// Two calibration layers exist side by side: the converter gain/offset (ADC-electrical) gates
// this stage, while the sensor trim (user/sensor-electrical) is applied to the nominal
// code-to-volt conversion.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::{result_code, AdcCalibration, CODE_RANGE, FULL_SCALE_VOLTAGE};
use crate::error::CalibrationError;

/// Sensor-side trim: `current = (volts - offset) * gain`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorTrim {
    pub offset: f32, // Sensor output at zero current [V]
    pub gain: f32,   // Sensor transconductance [A/V]
}

impl Default for SensorTrim {
    fn default() -> Self {
        Self {
            offset: 0.0,
            gain: 1.0,
        }
    }
}

/// Sensed current, overwritten every tick.
#[derive(Debug, Clone, Default)]
pub struct CurrentSense {
    trim: SensorTrim,
    sensed: f32, // Ia_sensor [A]
}

impl CurrentSense {
    pub fn new(trim: SensorTrim) -> Self {
        Self { trim, sensed: 0.0 }
    }

    /// Recomputes the sensed current from the latest raw sample.
    pub fn tick(&mut self, cal: &AdcCalibration, raw: u16) -> Result<f32, CalibrationError> {
        self.sensed = condition_current(cal, &self.trim, raw)?;
        Ok(self.sensed)
    }

    #[inline(always)]
    pub fn sensed(&self) -> f32 {
        self.sensed
    }

    pub fn trim(&self) -> SensorTrim {
        self.trim
    }

    pub fn set_trim(&mut self, trim: SensorTrim) {
        self.trim = trim;
    }
}

/// `((raw >> 4) * 3.0 / 4096 - offset) * gain`, available once the converter is calibrated.
pub fn condition_current(
    cal: &AdcCalibration,
    trim: &SensorTrim,
    raw: u16,
) -> Result<f32, CalibrationError> {
    if !cal.is_calibrated() {
        return Err(CalibrationError::NotCalibrated);
    }
    let volts = result_code(raw) as f32 * FULL_SCALE_VOLTAGE / CODE_RANGE;
    Ok((volts - trim.offset) * trim.gain)
}

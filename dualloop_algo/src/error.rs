// Error types reported by the calibration engines and the control tick.
//
// Every failure is returned as a value. Saturation is not an error and never shows up here; it is
// observable through the anti-windup term of each PI controller.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::fmt;

/// Failures of the two-stage ADC calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The averaged high and low reference codes are too close together (or reversed) to derive
    /// a gain. Values are the window averages in 12-bit codes.
    DegenerateReference { high: f32, low: f32 },
    /// Gain/offset calibration has not completed yet.
    NotCalibrated,
}

/// Failures of a control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Signal conditioning was requested before gain/offset calibration completed.
    NotCalibrated,
    /// Calibration window produced unusable results.
    Calibration(CalibrationError),
    /// The tick handler was entered again before the previous tick finished.
    Overrun,
}

impl From<CalibrationError> for ControlError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::NotCalibrated => ControlError::NotCalibrated,
            other => ControlError::Calibration(other),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::DegenerateReference { high, low } => write!(
                f,
                "reference channels too close: high {} codes, low {} codes",
                high, low
            ),
            CalibrationError::NotCalibrated => f.write_str("ADC gain/offset not calibrated"),
        }
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::NotCalibrated => f.write_str("ADC gain/offset not calibrated"),
            ControlError::Calibration(err) => write!(f, "calibration failed: {}", err),
            ControlError::Overrun => f.write_str("control tick overrun"),
        }
    }
}

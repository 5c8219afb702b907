// Boundary to the hardware abstraction layer: where raw samples come from and where the voltage
// command goes.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::sample_dump::AdcFrame;

/// Delivers raw ADC frames, one per control tick.
pub trait SampleSource {
    /// Latest complete frame, or `None` if nothing new arrived since the last call.
    fn sample(&mut self) -> Option<AdcFrame>;
}

/// Drives the power stage from a voltage command.
pub trait OutputStage {
    /// `voltage` is within `[-vdc, +vdc]`.
    fn apply_voltage(&mut self, voltage: f32, vdc: f32);

    /// Forces zero voltage on the motor terminals.
    fn disable(&mut self);
}

/// Maps a voltage command onto the duty cycle of a bipolar H-bridge.
///
/// `duty_ref` is the duty at zero volts; the full `[-vdc, +vdc]` range spans one unit of duty.
#[inline(always)]
pub fn voltage_to_duty(voltage: f32, vdc: f32, duty_ref: f32) -> f32 {
    if vdc <= 0.0 {
        return duty_ref;
    }
    (duty_ref + 0.5 * voltage / vdc).clamp(0.0, 1.0)
}

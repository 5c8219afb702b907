// ADC code conventions shared by the calibration engines and signal conditioning.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

pub mod adc_calibration;
pub mod channel_offset;
pub mod conditioning;

pub use adc_calibration::{AdcCalibration, CalStage, CalibrationResult};
pub use channel_offset::ChannelOffsets;
pub use conditioning::{CurrentSense, SensorTrim};

/// The converter left-aligns its 12-bit result in a 16-bit result register: the low 4 bits are
/// always zero and have to be shifted out.
pub const ADC_RESULT_SHIFT: u32 = 4;

/// Highest 12-bit code.
pub const CODE_MAX: f32 = 4095.0;

/// Number of 12-bit codes, used by signal conditioning.
pub const CODE_RANGE: f32 = 4096.0;

/// Converter full-scale input voltage [V].
pub const FULL_SCALE_VOLTAGE: f32 = 3.0;

/// Nominal voltage on the high reference channel [V].
pub const REF_HIGH_VOLTAGE: f32 = 1.25;

/// Nominal voltage on the low reference channel [V].
pub const REF_LOW_VOLTAGE: f32 = 0.625;

/// Samples averaged per calibration window (0.2 s at 20 kHz).
pub const NUM_CALOFFSET: u32 = 4_000;

/// Extracts the 12-bit code from a raw 16-bit result register value.
#[inline(always)]
pub const fn result_code(raw: u16) -> u16 {
    raw >> ADC_RESULT_SHIFT
}

/// Converts an ADC-calibrated code to volts.
#[inline(always)]
pub fn code_to_volts(code: f32) -> f32 {
    code * FULL_SCALE_VOLTAGE / CODE_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_code_drops_low_nibble() {
        assert_eq!(result_code(0xFFF0), 0x0FFF);
        assert_eq!(result_code(0x000F), 0);
        assert_eq!(result_code(1706 << 4), 1706);
    }

    #[test]
    fn full_scale_code_is_full_scale_voltage() {
        assert!((code_to_volts(CODE_MAX) - FULL_SCALE_VOLTAGE).abs() < 1e-6);
    }
}

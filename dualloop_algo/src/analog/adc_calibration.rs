// Implements the first ADC calibration stage: gain and offset error of the converter, derived from
// two channels tied to known reference voltages.

// Detailed Operation:
// Every tick the raw codes of the high (1.25 V) and low (0.625 V) reference channels are summed.
// After a full window both sums are averaged and the line through the two averages is mapped
// onto the ideal transfer curve:
//
//   gain   = (4095 * 0.625 / 3.0) / (yH_avg - yL_avg)
//   offset = yL_avg * gain - 4095 * 0.625 / 3.0
//
// so that `code * gain - offset` is the ideal 12-bit code of the input voltage. The window counter
// is shared with the channel offset stage, which runs next.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use num_traits::float::FloatCore;

use super::{code_to_volts, result_code, CODE_MAX, FULL_SCALE_VOLTAGE, REF_HIGH_VOLTAGE, REF_LOW_VOLTAGE};
use crate::error::CalibrationError;

/// Ideal code distance between the two reference channels.
const REF_SPAN_CODES: f32 = (REF_HIGH_VOLTAGE - REF_LOW_VOLTAGE) * CODE_MAX / FULL_SCALE_VOLTAGE;

/// Ideal code of the low reference channel.
const REF_LOW_CODES: f32 = REF_LOW_VOLTAGE * CODE_MAX / FULL_SCALE_VOLTAGE;

/// Smallest averaged distance between the reference channels accepted as a valid window [codes].
pub const MIN_REFERENCE_SPAN: f32 = 16.0;

/// Progress of the two-stage calibration. Ordered, so `stage >= GainOffsetDone` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalStage {
    Uncalibrated,
    GainOffsetDone,
    ChannelOffsetDone,
}

/// Outcome of a completed gain/offset window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationResult {
    pub gain: f32,
    pub offset: f32,
    pub gain_error: f32,
    pub offset_error: f32,
}

/// ADC gain/offset calibration state.
#[derive(Debug, Clone)]
pub struct AdcCalibration {
    window: u32,       // Samples per calibration window
    yh_accum: u64,     // Running sum of high reference codes
    yl_accum: u64,     // Running sum of low reference codes
    sample_count: u32, // Samples in the current window (shared by both stages)

    gain: f32,         // Scale applied to raw codes
    offset: f32,       // Bias subtracted after scaling [codes]
    gain_error: f32,   // |1 - gain|
    offset_error: f32, // |offset|

    stage: CalStage,
}

impl AdcCalibration {
    /// Creates an uncalibrated engine averaging `window` samples per stage.
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
            yh_accum: 0,
            yl_accum: 0,
            sample_count: 0,
            gain: 0.0,
            offset: 0.0,
            gain_error: 0.0,
            offset_error: 0.0,
            stage: CalStage::Uncalibrated,
        }
    }

    /// Adds one sample of both reference channels.
    ///
    /// Returns `Ok(Some(_))` on the sample that completes the window. The reference channels must
    /// be physically distinct; a window whose averages are closer than `MIN_REFERENCE_SPAN` codes is
    /// discarded and reported as `DegenerateReference`, leaving the stage unchanged.
    pub fn accumulate_gain_offset_sample(
        &mut self,
        raw_high: u16,
        raw_low: u16,
    ) -> Result<Option<CalibrationResult>, CalibrationError> {
        self.yh_accum += result_code(raw_high) as u64;
        self.yl_accum += result_code(raw_low) as u64;

        if !self.advance_window() {
            return Ok(None);
        }

        let yh_avg = (self.yh_accum as f64 / self.window as f64) as f32;
        let yl_avg = (self.yl_accum as f64 / self.window as f64) as f32;
        self.yh_accum = 0;
        self.yl_accum = 0;
        self.sample_count = 0;

        let span = yh_avg - yl_avg;
        if !(span > MIN_REFERENCE_SPAN) {
            error!(
                "CALIBRATION: reference channels too close (high {}, low {})",
                yh_avg, yl_avg
            );
            return Err(CalibrationError::DegenerateReference {
                high: yh_avg,
                low: yl_avg,
            });
        }

        self.gain = REF_SPAN_CODES / span;
        self.offset = yl_avg * self.gain - REF_LOW_CODES;
        self.gain_error = FloatCore::abs(1.0 - self.gain);
        self.offset_error = FloatCore::abs(self.offset);
        self.stage = CalStage::GainOffsetDone;

        info!(
            "CALIBRATION: ADC gain {} offset {} codes",
            self.gain, self.offset
        );

        Ok(Some(CalibrationResult {
            gain: self.gain,
            offset: self.offset,
            gain_error: self.gain_error,
            offset_error: self.offset_error,
        }))
    }

    /// Counts one sample into the shared window. Returns true when the window is full.
    #[inline(always)]
    pub(crate) fn advance_window(&mut self) -> bool {
        self.sample_count += 1;
        self.sample_count >= self.window
    }

    #[inline(always)]
    pub(crate) fn reset_window(&mut self) {
        self.sample_count = 0;
    }

    #[inline(always)]
    pub(crate) fn set_stage(&mut self, stage: CalStage) {
        self.stage = stage;
    }

    /// ADC-corrected 12-bit code of a raw result register value.
    #[inline(always)]
    pub fn calibrated_code(&self, raw: u16) -> Result<f32, CalibrationError> {
        if !self.is_calibrated() {
            return Err(CalibrationError::NotCalibrated);
        }
        Ok(result_code(raw) as f32 * self.gain - self.offset)
    }

    /// ADC-corrected input voltage of a raw result register value [V].
    pub fn calibrated_volts(&self, raw: u16) -> Result<f32, CalibrationError> {
        self.calibrated_code(raw).map(code_to_volts)
    }

    /// True once gain and offset are valid.
    #[inline(always)]
    pub fn is_calibrated(&self) -> bool {
        self.stage >= CalStage::GainOffsetDone
    }

    /// Drops all calibration results and starts over.
    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }

    pub fn stage(&self) -> CalStage {
        self.stage
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn gain_error(&self) -> f32 {
        self.gain_error
    }

    pub fn offset_error(&self) -> f32 {
        self.offset_error
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Current (high, low) reference sums.
    pub fn accumulators(&self) -> (u64, u64) {
        (self.yh_accum, self.yl_accum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C_H: u16 = 1706;
    const C_L: u16 = 853;

    fn calibrate(cal: &mut AdcCalibration, high: u16, low: u16) -> Option<CalibrationResult> {
        let mut last = None;
        for _ in 0..cal.window() {
            last = cal.accumulate_gain_offset_sample(high << 4, low << 4).unwrap();
        }
        last
    }

    #[test]
    fn converges_to_reference_voltages() {
        let mut cal = AdcCalibration::new(100);
        let result = calibrate(&mut cal, C_H, C_L).expect("window should complete");

        assert!(cal.is_calibrated());
        assert_eq!(result.gain, cal.gain());
        let high = cal.calibrated_volts(C_H << 4).unwrap();
        let low = cal.calibrated_volts(C_L << 4).unwrap();
        assert!((high - REF_HIGH_VOLTAGE).abs() < 1e-4, "high = {}", high);
        assert!((low - REF_LOW_VOLTAGE).abs() < 1e-4, "low = {}", low);
        assert!((result.gain_error - (1.0 - result.gain).abs()).abs() < 1e-7);
        assert!((result.offset_error - result.offset.abs()).abs() < 1e-7);
    }

    #[test]
    fn corrects_skewed_converter() {
        // Converter reading 5 % high with a 20-code pedestal
        let high = (REF_SPAN_CODES * 2.0 * 1.05 + 20.0) as u16;
        let low = (REF_LOW_CODES * 1.05 + 20.0) as u16;
        let mut cal = AdcCalibration::new(10);
        calibrate(&mut cal, high, low).unwrap();

        assert!(cal.gain() < 1.0);
        assert!(cal.gain_error() > 0.04);
        assert!((cal.calibrated_volts(high << 4).unwrap() - REF_HIGH_VOLTAGE).abs() < 1e-3);
        assert!((cal.calibrated_volts(low << 4).unwrap() - REF_LOW_VOLTAGE).abs() < 1e-3);
    }

    #[test]
    fn window_resets_after_completion() {
        let mut cal = AdcCalibration::new(50);
        for i in 0..49 {
            assert_eq!(
                cal.accumulate_gain_offset_sample(C_H << 4, C_L << 4),
                Ok(None)
            );
            assert_eq!(cal.sample_count(), i + 1);
        }
        assert_eq!(cal.stage(), CalStage::Uncalibrated);

        assert!(cal
            .accumulate_gain_offset_sample(C_H << 4, C_L << 4)
            .unwrap()
            .is_some());
        assert_eq!(cal.accumulators(), (0, 0));
        assert_eq!(cal.sample_count(), 0);
        assert_eq!(cal.stage(), CalStage::GainOffsetDone);

        // One more sample starts a fresh window
        assert_eq!(
            cal.accumulate_gain_offset_sample(C_H << 4, C_L << 4),
            Ok(None)
        );
        assert_eq!(cal.sample_count(), 1);
        assert_eq!(cal.accumulators(), (C_H as u64, C_L as u64));
        assert_eq!(cal.stage(), CalStage::GainOffsetDone);
    }

    #[test]
    fn long_window_does_not_overflow() {
        // 4095 * 1.1M exceeds u32::MAX
        const WINDOW: u32 = 1_100_000;
        let mut cal = AdcCalibration::new(WINDOW);
        for _ in 0..WINDOW - 1 {
            assert_eq!(cal.accumulate_gain_offset_sample(4000 << 4, 3000 << 4), Ok(None));
        }
        assert_eq!(cal.accumulators(), (4000 * (WINDOW as u64 - 1), 3000 * (WINDOW as u64 - 1)));

        let result = cal
            .accumulate_gain_offset_sample(4000 << 4, 3000 << 4)
            .unwrap()
            .unwrap();
        assert!((result.gain - REF_SPAN_CODES / 1000.0).abs() < 1e-6);
        assert!((cal.calibrated_volts(4000 << 4).unwrap() - REF_HIGH_VOLTAGE).abs() < 1e-4);
        assert!((cal.calibrated_volts(3000 << 4).unwrap() - REF_LOW_VOLTAGE).abs() < 1e-4);
    }

    #[test]
    fn degenerate_reference_is_reported() {
        let mut cal = AdcCalibration::new(8);
        for _ in 0..7 {
            assert_eq!(cal.accumulate_gain_offset_sample(1000 << 4, 1000 << 4), Ok(None));
        }
        let err = cal
            .accumulate_gain_offset_sample(1000 << 4, 1000 << 4)
            .unwrap_err();
        assert_eq!(
            err,
            CalibrationError::DegenerateReference {
                high: 1000.0,
                low: 1000.0
            }
        );
        assert!(!cal.is_calibrated());
        assert_eq!(cal.sample_count(), 0);
        assert_eq!(cal.accumulators(), (0, 0));
        assert!(cal.gain().is_finite());
    }

    #[test]
    fn reversed_reference_is_reported() {
        let mut cal = AdcCalibration::new(1);
        assert!(matches!(
            cal.accumulate_gain_offset_sample(C_L << 4, C_H << 4),
            Err(CalibrationError::DegenerateReference { .. })
        ));
    }

    #[test]
    fn conversion_refused_before_calibration() {
        let cal = AdcCalibration::new(4);
        assert_eq!(cal.calibrated_code(0x8000), Err(CalibrationError::NotCalibrated));
    }

    #[test]
    fn reset_returns_to_uncalibrated() {
        let mut cal = AdcCalibration::new(2);
        calibrate(&mut cal, C_H, C_L).unwrap();
        cal.reset();
        assert_eq!(cal.stage(), CalStage::Uncalibrated);
        assert_eq!(cal.window(), 2);
        assert_eq!(cal.gain(), 0.0);
    }
}

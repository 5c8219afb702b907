// Second calibration stage: DC bias of each current sense channel with no current flowing.
// Runs only once the converter gain/offset is known and reuses its window counter.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::{result_code, AdcCalibration, CalStage};
use crate::error::CalibrationError;

/// Number of sense channels (A1..A4).
pub const CHANNELS: usize = 4;

/// Per-channel DC offsets in ADC-calibrated codes.
///
/// Channel A2 has no sensor behind it: its sum is never accumulated and its offset stays 0.
#[derive(Debug, Clone, Default)]
pub struct ChannelOffsets {
    sums: [u64; CHANNELS],    // Raw code sums of the current window
    offsets: [f32; CHANNELS], // Averaged, ADC-calibrated offsets (A1OffsetCal..A4OffsetCal)
}

impl ChannelOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample of channels A1, A3 and A4.
    ///
    /// Each sample contributes `(raw >> 4) * gain - offset`. Since that correction is linear the
    /// sums hold plain codes and the correction is applied once to the averages. On the sample that
    /// completes the window the averaged offsets are returned and the stage advances to
    /// `ChannelOffsetDone`.
    pub fn accumulate(
        &mut self,
        cal: &mut AdcCalibration,
        raw1: u16,
        raw3: u16,
        raw4: u16,
    ) -> Result<Option<[f32; CHANNELS]>, CalibrationError> {
        if !cal.is_calibrated() {
            return Err(CalibrationError::NotCalibrated);
        }

        self.sums[0] += result_code(raw1) as u64;
        self.sums[2] += result_code(raw3) as u64;
        self.sums[3] += result_code(raw4) as u64;

        if !cal.advance_window() {
            return Ok(None);
        }

        let window = cal.window() as f64;
        let (gain, offset) = (cal.gain(), cal.offset());
        for (avg, sum) in self.offsets.iter_mut().zip(self.sums.iter_mut()) {
            *avg = (*sum as f64 / window) as f32 * gain - offset;
            *sum = 0;
        }
        // A2 is never sampled
        self.offsets[1] = 0.0;

        cal.reset_window();
        cal.set_stage(CalStage::ChannelOffsetDone);

        info!(
            "CALIBRATION: channel offsets A1 {} A3 {} A4 {}",
            self.offsets[0], self.offsets[2], self.offsets[3]
        );

        Ok(Some(self.offsets))
    }

    /// Offset of channel `ch` (0 = A1 .. 3 = A4) in calibrated codes, `None` past A4.
    #[inline(always)]
    pub fn offset(&self, ch: usize) -> Option<f32> {
        self.offsets.get(ch).copied()
    }

    pub fn offsets(&self) -> [f32; CHANNELS] {
        self.offsets
    }

    pub fn sums(&self) -> [u64; CHANNELS] {
        self.sums
    }
}

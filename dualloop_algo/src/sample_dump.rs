// Implements a double-buffering system for raw ADC frames, ensuring the control tick only ever
// sees a complete frame from a single conversion sequence.

// Key Features:
// - Two `AdcFrame` buffers: one being filled by the acquisition interrupts, one ready for reading.
// - A bitmask tracks which field groups of the filling buffer are still pending.
// - Buffers swap once every mandatory field group has been written.
// - Reads briefly set a lock bit on the ready buffer.

// Detailed Operation:
// The acquisition side calls `set_phase_adc()` and `set_reference_adc()` as DMA transfers
// complete. When all groups named in `MANDATORY_FIELDS` are written the filling buffer becomes the
// ready buffer and collection continues in the other one. The control side polls `is_updated()`
// and copies the ready frame out with `get_data()`.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::io::SampleSource;

/// Raw 16-bit result register values of one conversion sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcFrame {
    /// Current sense channels A1..A4. A2 is not wired.
    pub phase: [u16; 4],

    /// High reference channel (nominal 1.25 V).
    pub ref_high: u16,

    /// Low reference channel (nominal 0.625 V).
    pub ref_low: u16,
}

impl AdcFrame {
    pub const ZERO: AdcFrame = AdcFrame {
        phase: [0; 4],
        ref_high: 0,
        ref_low: 0,
    };
}

/// Bit masks for each field group of `AdcFrame`, plus the read lock.
#[repr(u32)]
#[derive(Debug, Clone, Copy)]
pub enum FrameBit {
    /// Current sense channels.
    PHASE = 1 << 0,

    /// Both reference channels.
    REFERENCE = 1 << 1,

    /// Lock bit at the most significant bit.
    LOCK = 1 << 31,
}

/// Every field group of `AdcFrame`.
pub const ALL_FIELDS: u32 = FrameBit::PHASE as u32 | FrameBit::REFERENCE as u32;

/// Two `AdcFrame` buffers and their fill/lock flags.
pub struct SampleDump<const MANDATORY_FIELDS: u32> {
    /// Two buffers: one being updated, one ready for reading.
    buffers: [AdcFrame; 2],

    /// Index of the buffer currently being updated.
    idx2update: usize,

    /// Pending field bits and lock bit for each buffer.
    flags: [u32; 2],

    /// Completed frame counter.
    iter: usize,

    /// Frame counter at the last read.
    prev_iter: usize,
}

impl<const MANDATORY_FIELDS: u32> SampleDump<MANDATORY_FIELDS> {
    /// Creates a dump with buffer 0 pending and buffer 1 ready.
    pub const fn new() -> Self {
        Self {
            buffers: [AdcFrame::ZERO, AdcFrame::ZERO],
            idx2update: 0,
            flags: [MANDATORY_FIELDS, 0],
            iter: 0,
            prev_iter: 0,
        }
    }

    #[inline(always)]
    fn is_ready(&self, idx: usize) -> bool {
        self.flags[idx] == 0
    }

    #[inline(always)]
    fn get_opposite(&self, idx: usize) -> usize {
        1 - idx
    }

    #[inline(always)]
    fn clear_field_bit(&mut self, idx: usize, bit: FrameBit) {
        self.flags[idx] &= !(bit as u32);
    }

    /// Swaps buffers once the filling one is complete.
    fn check_fill(&mut self, idx: usize) {
        if self.is_ready(0) && self.is_ready(1) {
            let idx = self.get_opposite(idx);
            self.flags[idx] = MANDATORY_FIELDS;
            self.idx2update = idx;
            self.iter = self.iter.wrapping_add(1);
        }
    }

    /// Stores the current sense channels.
    pub fn set_phase_adc(&mut self, values: [u16; 4]) {
        let idx = self.idx2update;
        self.buffers[idx].phase = values;
        self.clear_field_bit(idx, FrameBit::PHASE);
        self.check_fill(idx);
    }

    /// Stores both reference channels.
    pub fn set_reference_adc(&mut self, high: u16, low: u16) {
        let idx = self.idx2update;
        self.buffers[idx].ref_high = high;
        self.buffers[idx].ref_low = low;
        self.clear_field_bit(idx, FrameBit::REFERENCE);
        self.check_fill(idx);
    }

    /// True if a new frame completed since the last read.
    #[inline(always)]
    pub fn is_updated(&self) -> bool {
        self.iter != self.prev_iter
    }

    /// Copies the ready frame out.
    #[inline(always)]
    pub fn get_data(&mut self) -> AdcFrame {
        let ready_idx = self.get_opposite(self.idx2update);
        self.flags[ready_idx] |= FrameBit::LOCK as u32;
        let data = self.buffers[ready_idx];
        self.prev_iter = self.iter;
        self.flags[ready_idx] &= !(FrameBit::LOCK as u32);
        data
    }
}

impl<const MANDATORY_FIELDS: u32> Default for SampleDump<MANDATORY_FIELDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MANDATORY_FIELDS: u32> SampleSource for SampleDump<MANDATORY_FIELDS> {
    fn sample(&mut self) -> Option<AdcFrame> {
        if self.is_updated() {
            Some(self.get_data())
        } else {
            None
        }
    }
}

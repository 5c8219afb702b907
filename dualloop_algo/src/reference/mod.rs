// Generates test trajectories for the loop under test, one sample per control tick.

// Key Features:
// - Step waveform for the current loop: amplitude for one phase, then stops.
// - Four-phase square waveform for the speed loop: +amplitude, 0, -amplitude, 0, then stops.
// - Phase length given in seconds and converted with the control rate, so the rate must be the
//   same one the loops run at (tick_hz == 1 / Ts).
// - Runs only while armed; a finished or stopped generator holds its last output.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use num_traits::float::FloatCore;

/// Number of phases of the longest waveform.
const PHASES: usize = 4;

/// Shape of the generated reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Waveform {
    /// Current reference: `amplitude` for one phase.
    Step,
    /// Speed reference: `+amplitude -> 0 -> -amplitude -> 0`, one phase each.
    Square,
}

/// Time-indexed reference trajectory.
#[derive(Debug, Clone)]
pub struct ReferenceGenerator {
    waveform: Waveform,
    tick_hz: u32,   // Control rate [ticks/s]
    period: f32,    // Length of one phase [s] (Ref_time)
    amplitude: f32, // Waveform amplitude
    count: u64,     // Ticks since the waveform started
    active: bool,   // Generation armed (Gen_Ref_Chk)
    output: f32,    // Last generated reference

    phase_ends: [u64; PHASES], // Tick at which phase n + 1 ends
}

impl ReferenceGenerator {
    /// Creates an idle generator.
    pub fn new(waveform: Waveform, tick_hz: u32, period: f32, amplitude: f32) -> Self {
        Self {
            waveform,
            tick_hz,
            period,
            amplitude,
            count: 0,
            active: false,
            output: 0.0,
            phase_ends: Self::phase_ends(tick_hz, period),
        }
    }

    /// Arms a new run from the first sample.
    pub fn start(&mut self, waveform: Waveform, amplitude: f32, period: f32) {
        self.waveform = waveform;
        self.amplitude = amplitude;
        self.period = period;
        self.phase_ends = Self::phase_ends(self.tick_hz, period);
        self.count = 0;
        self.active = true;
        debug!("REFERENCE: start, amplitude {} period {}s", amplitude, period);
    }

    /// Disarms the generator without touching the held output.
    pub fn stop(&mut self) {
        self.count = 0;
        self.active = false;
    }

    /// Advances one tick and returns the reference.
    pub fn tick(&mut self) -> f32 {
        if self.active {
            match self.waveform {
                Waveform::Step => self.tick_step(),
                Waveform::Square => self.tick_square(),
            }
        }
        self.output
    }

    fn tick_step(&mut self) {
        if self.count < self.phase_ends[0] {
            self.output = self.amplitude;
            self.count += 1;
        } else {
            self.count = 0;
            self.active = false;
        }
    }

    fn tick_square(&mut self) {
        let count = self.count;
        if count < self.phase_ends[0] {
            self.output = self.amplitude;
        } else if count < self.phase_ends[1] {
            self.output = 0.0;
        } else if count < self.phase_ends[2] {
            self.output = -self.amplitude;
        } else if count < self.phase_ends[3] {
            self.output = 0.0;
        } else {
            self.count = 0;
            self.amplitude = 0.0;
            self.active = false;
            return;
        }
        self.count += 1;
    }

    /// Phase `n` ends at the first whole tick not below `period * tick_hz * n`.
    fn phase_ends(tick_hz: u32, period: f32) -> [u64; PHASES] {
        let mut ends = [0; PHASES];
        for (n, end) in ends.iter_mut().enumerate() {
            let edge = period as f64 * tick_hz as f64 * (n + 1) as f64;
            // Negative or NaN periods saturate to 0
            *end = FloatCore::ceil(edge) as u64;
        }
        ends
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Overrides the held output, used when the reference is set directly.
    pub fn hold(&mut self, value: f32) {
        self.output = value;
    }
}

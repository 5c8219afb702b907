#![cfg_attr(not(test), no_std)]

// This must go first so the logging macros are visible to every other module.
mod fmt;

pub mod analog;
pub mod control;
pub mod error;
pub mod io;
pub mod math_float;
pub mod params;
pub mod reference;
pub mod sample_dump;
pub mod scheduler;

use analog::{AdcCalibration, CalStage, ChannelOffsets, CurrentSense, SensorTrim};
use control::{CascadeController, ControlMode};
use error::ControlError;
use params::Parameters;
use reference::{ReferenceGenerator, Waveform};
use sample_dump::AdcFrame;

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverStatus {
    /// ADC gain/offset or channel offsets still being measured, output held at 0 V.
    Calibrating,
    /// Loops are closed according to the selected mode.
    Ready,
    /// A fault was latched, output held at 0 V until `recalibrate()`.
    Fault,
}

/// The control engine, owning every piece of state touched by a tick.
pub struct MotorController {
    params: Parameters, // Motor constants and loop gains

    status: DriverStatus, // Calibrating, Ready or Fault
    mode: ControlMode,    // Which loop is closed
    fault: Option<ControlError>,

    calibration: AdcCalibration,    // Converter gain/offset
    channel_offsets: ChannelOffsets, // Per-channel DC bias
    sense: CurrentSense,            // Ia_sensor
    reference: ReferenceGenerator,  // Test trajectory
    cascade: CascadeController,     // Speed and current PI loops

    voltage: f32, // Voltage command of the last tick [V]
}

impl MotorController {
    /// Create a new controller.
    ///
    /// # Arguments
    /// * `params` - Output of `params::init_parameters()`
    /// * `window` - Samples averaged per calibration stage
    /// * `trim` - Current sensor trim applied during signal conditioning
    pub fn new(params: Parameters, window: u32, trim: SensorTrim) -> Self {
        Self {
            status: DriverStatus::Calibrating,
            mode: ControlMode::Idle,
            fault: None,

            calibration: AdcCalibration::new(window),
            channel_offsets: ChannelOffsets::new(),
            sense: CurrentSense::new(trim),
            reference: ReferenceGenerator::new(
                Waveform::Step,
                params.tick_hz,
                params.reference.time,
                params.reference.amplitude,
            ),
            cascade: CascadeController::new(&params),

            voltage: 0.0,
            params,
        }
    }

    /// Runs one control tick and returns the voltage command.
    ///
    /// Order within the tick: signal conditioning, calibration (until both stages are done),
    /// reference generation, control step. The command is 0 V while calibrating, in `Idle` mode,
    /// and after a fault.
    pub fn tick(&mut self, frame: &AdcFrame) -> Result<f32, ControlError> {
        if let Some(err) = self.fault {
            self.voltage = 0.0;
            return Err(err);
        }

        if self.calibration.is_calibrated() {
            self.sense.tick(&self.calibration, frame.phase[0])?;
        }

        // Loops close from the tick after calibration completes
        if self.status != DriverStatus::Ready {
            if let Err(err) = self.tick_calibration(frame) {
                return Err(self.latch_fault(err));
            }
            self.voltage = 0.0;
            return Ok(self.voltage);
        }

        let reference = self.reference.tick();
        let sensed = self.sense.sensed();

        self.voltage = match self.mode {
            ControlMode::Idle => 0.0,
            ControlMode::Current => self.cascade.step_current_loop(reference, sensed),
            ControlMode::Speed => {
                let voltage = self.cascade.voltage();
                self.cascade.step_speed_loop(reference, sensed, voltage)
            }
        };
        Ok(self.voltage)
    }

    fn tick_calibration(&mut self, frame: &AdcFrame) -> Result<(), ControlError> {
        match self.calibration.stage() {
            CalStage::Uncalibrated => {
                self.calibration
                    .accumulate_gain_offset_sample(frame.ref_high, frame.ref_low)?;
            }
            CalStage::GainOffsetDone => {
                let done = self.channel_offsets.accumulate(
                    &mut self.calibration,
                    frame.phase[0],
                    frame.phase[2],
                    frame.phase[3],
                )?;
                if done.is_some() {
                    self.status = DriverStatus::Ready;
                    info!("DRIVER: calibration complete");
                }
            }
            CalStage::ChannelOffsetDone => {}
        }
        Ok(())
    }

    /// Latches a fault. Every following tick returns it with a 0 V command.
    pub fn latch_fault(&mut self, err: ControlError) -> ControlError {
        if self.fault.is_none() {
            error!("DRIVER: fault latched: {}", err);
        }
        self.fault = Some(err);
        self.status = DriverStatus::Fault;
        self.voltage = 0.0;
        err
    }

    /// Clears any fault and restarts both calibration stages.
    pub fn recalibrate(&mut self) {
        self.fault = None;
        self.status = DriverStatus::Calibrating;
        self.calibration.reset();
        self.channel_offsets = ChannelOffsets::new();
        self.cascade.reset();
        self.voltage = 0.0;
        info!("DRIVER: calibration restarted");
    }

    /// Selects the closed loop and clears both PI states.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            self.cascade.reset();
            self.reference.stop();
            self.reference.hold(0.0);
            self.mode = mode;
            debug!("DRIVER: mode {}", mode);
        }
    }

    /// Starts a generated reference: a step for current mode, a square wave for speed mode.
    pub fn start_reference(&mut self, amplitude: f32, period: f32) {
        let waveform = match self.mode {
            ControlMode::Speed => Waveform::Square,
            _ => Waveform::Step,
        };
        self.reference.start(waveform, amplitude, period);
    }

    /// Stops generation and holds a fixed reference.
    pub fn set_reference(&mut self, value: f32) {
        self.reference.stop();
        self.reference.hold(value);
    }

    /// PWM duty for the last voltage command.
    #[inline(always)]
    pub fn duty(&self) -> f32 {
        io::voltage_to_duty(self.voltage, self.params.motor.vdc, self.params.motor.duty_ref)
    }

    #[inline(always)]
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    pub fn status(&self) -> DriverStatus {
        self.status
    }

    pub fn fault(&self) -> Option<ControlError> {
        self.fault
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn sensed_current(&self) -> f32 {
        self.sense.sensed()
    }

    pub fn reference(&self) -> &ReferenceGenerator {
        &self.reference
    }

    pub fn calibration(&self) -> &AdcCalibration {
        &self.calibration
    }

    pub fn channel_offsets(&self) -> &ChannelOffsets {
        &self.channel_offsets
    }

    pub fn cascade(&self) -> &CascadeController {
        &self.cascade
    }

    /// Estimated rotor speed [rpm].
    pub fn speed_estimate(&self) -> f32 {
        self.cascade.estimator().speed_rpm()
    }
}

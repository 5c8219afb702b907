// Fixed physical and control constants for the dual current/speed loop.

// Key Features:
// - One-shot initializer populating motor constants and loop gains.
// - Current-loop gains placed by pole/zero cancellation at the current bandwidth.
// - Speed-loop gains derived from the mechanical model at a tenth of the current bandwidth.
// - Sample time always derived from the tick rate so `Ts == 1 / tick_hz` holds.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::f32::consts::PI;

/// Control loop rate in ticks per second.
pub const TICK_HZ: u32 = 20_000;

/// Ratio between the current and speed loop bandwidths.
const SPEED_BANDWIDTH_DIVIDER: f32 = 10.0;

/// Ratio between the speed loop bandwidth and its PI zero.
const SPEED_ZERO_DIVIDER: f32 = 5.0;

/// rad/s -> rpm
pub const RAD_S_TO_RPM: f32 = 30.0 / PI;

/// Motor constants, read-only once initialized.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorParameters {
    pub ra: f32,       // Armature resistance [Ohm]
    pub la: f32,       // Armature inductance [H]
    pub ke: f32,       // Back-EMF constant [V/(rad/s)]
    pub kt: f32,       // Torque constant [Nm/A]
    pub j: f32,        // Rotor inertia [kg*m^2]
    pub vdc: f32,      // DC bus voltage, limit of the voltage command [V]
    pub ia_stall: f32, // Stall current, limit of the current reference [A]
    pub ts: f32,       // Sample time [s]
    pub duty_ref: f32, // PWM duty at zero voltage command
}

/// Gains of one PI loop with back-calculation anti-windup.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PiGains {
    pub kp: f32,
    pub ki: f32,
    pub ka: f32,
}

/// Default amplitude and phase length of generated reference waveforms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReferenceSettings {
    pub time: f32,      // Length of one waveform phase [s]
    pub amplitude: f32, // Amplitude [A] or [rpm]
}

/// Everything the control loops read at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Parameters {
    pub motor: MotorParameters,
    pub wcc: f32, // Current loop bandwidth [rad/s]
    pub wsc: f32, // Speed loop bandwidth [rad/s]
    pub current: PiGains,
    pub speed: PiGains,
    pub reference: ReferenceSettings,
    pub tick_hz: u32,
}

/// Populates the motor constants and loop gains. Must run before the first control step.
pub fn init_parameters() -> Parameters {
    let ra = 0.3;
    let la = 0.002;
    let wcc = 2.0 * PI * 20.0;

    let kp = la * wcc;
    let ki = ra * wcc;
    let ka = 1.0 / kp;

    let vdc = 12.0;
    let j = 3.517e-5;
    let ke = 0.0277;
    let kt = 0.0277;

    let motor = MotorParameters {
        ra,
        la,
        ke,
        kt,
        j,
        vdc,
        ia_stall: vdc / ra,
        ts: 1.0 / TICK_HZ as f32,
        duty_ref: 0.5,
    };

    let wsc = wcc / SPEED_BANDWIDTH_DIVIDER;

    Parameters {
        motor,
        wcc,
        wsc,
        current: PiGains { kp, ki, ka },
        speed: speed_gains(&motor, wsc),
        reference: ReferenceSettings {
            time: 1.0,
            amplitude: 0.0,
        },
        tick_hz: TICK_HZ,
    }
}

/// Speed PI gains for a pure-inertia plant `Kt / (J s)`, with the speed error in rpm.
fn speed_gains(motor: &MotorParameters, wsc: f32) -> PiGains {
    let kp = motor.j * wsc / motor.kt / RAD_S_TO_RPM;
    PiGains {
        kp,
        ki: kp * wsc / SPEED_ZERO_DIVIDER,
        ka: 1.0 / kp,
    }
}

impl Parameters {
    /// Rebuilds the sample time for a different control rate.
    pub fn with_tick_rate(mut self, tick_hz: u32) -> Self {
        self.tick_hz = tick_hz;
        self.motor.ts = 1.0 / tick_hz as f32;
        self
    }

    /// Sample time [s].
    #[inline(always)]
    pub fn ts(&self) -> f32 {
        self.motor.ts
    }
}

impl Default for Parameters {
    fn default() -> Self {
        init_parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializer_values() {
        let p = init_parameters();
        assert_eq!(p.motor.ra, 0.3);
        assert_eq!(p.motor.la, 0.002);
        assert_eq!(p.motor.vdc, 12.0);
        assert_eq!(p.motor.duty_ref, 0.5);
        assert_eq!(p.motor.ke, 0.0277);
        assert_eq!(p.motor.kt, 0.0277);
        assert_eq!(p.reference.time, 1.0);
        assert_eq!(p.reference.amplitude, 0.0);
        assert!((p.wcc - 125.663_7).abs() < 1e-3);
        assert!((p.current.kp - 0.002 * p.wcc).abs() < 1e-6);
        assert!((p.current.ki - 0.3 * p.wcc).abs() < 1e-4);
        assert!((p.current.ka * p.current.kp - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sample_time_follows_tick_rate() {
        let p = init_parameters();
        assert_eq!(p.tick_hz, TICK_HZ);
        assert!((p.ts() - 50e-6).abs() < 1e-9);

        let p = p.with_tick_rate(10_000);
        assert_eq!(p.tick_hz, 10_000);
        assert!((p.ts() - 100e-6).abs() < 1e-9);
    }

    #[test]
    fn speed_loop_is_slower_than_current_loop() {
        let p = init_parameters();
        assert!(p.wsc < p.wcc);
        assert!(p.speed.kp > 0.0 && p.speed.ki > 0.0);
        assert!((p.speed.ka * p.speed.kp - 1.0).abs() < 1e-4);
        assert!((p.motor.ia_stall - 40.0).abs() < 1e-4);
    }
}

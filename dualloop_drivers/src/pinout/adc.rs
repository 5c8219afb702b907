//! Analog inputs sampled by ADC1 every control tick.
use super::PinDef;
use super::{PinMode, Port};

/// Armature current sense A1 (ADC1_IN1)
pub const I_A1: PinDef = PinDef::new(Port::A, 0, PinMode::Analog);

/// Auxiliary current sense A3 (ADC1_IN2)
pub const I_A3: PinDef = PinDef::new(Port::A, 1, PinMode::Analog);

/// Auxiliary current sense A4 (ADC1_IN3)
pub const I_A4: PinDef = PinDef::new(Port::A, 2, PinMode::Analog);

/// 1.25 V calibration reference (ADC1_IN4)
pub const VREF_HIGH: PinDef = PinDef::new(Port::A, 3, PinMode::Analog);

/// 0.625 V calibration reference (ADC1_IN5)
pub const VREF_LOW: PinDef = PinDef::new(Port::B, 14, PinMode::Analog);

//! Status LEDs.
use super::PinDef;
use super::{PinMode, Port};

/// Lit while a fault is latched
pub const FAULT: PinDef = PinDef::new(Port::B, 15, PinMode::Output);

/// Lit once calibration completed and the loops are closed
pub const READY: PinDef = PinDef::new(Port::B, 13, PinMode::Output);

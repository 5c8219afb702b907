//! H-bridge power stage pins.
use super::PinDef;
use super::{PinMode, Port};

/// Gate driver reset, held high while running
pub const RESET: PinDef = PinDef::new(Port::B, 2, PinMode::Output);

/// Gate driver enable
pub const ENABLE: PinDef = PinDef::new(Port::A, 4, PinMode::Output);

/// Positive leg of the bridge (TIM2_CH1)
pub const PWM_POS: PinDef = PinDef::new(Port::A, 15, PinMode::Alt(1));

/// Negative leg of the bridge (TIM2_CH2)
pub const PWM_NEG: PinDef = PinDef::new(Port::B, 3, PinMode::Alt(1));

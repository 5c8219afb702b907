use hal::gpio::{Pin, PinMode, Port};

pub mod adc;
pub mod driver;
pub mod led;

/// Represents the definition of a GPIO pin.
pub struct PinDef {
    /// The port to which the pin belongs (e.g., Port::A, Port::B).
    port: Port,
    /// The pin number within the port.
    pin: u8,
    /// The mode of the pin (e.g., Output, Analog, Alternate function).
    mode: PinMode,
}

impl PinDef {
    pub const fn new(port: Port, pin: u8, mode: PinMode) -> PinDef {
        PinDef { port, pin, mode }
    }

    /// Configures the pin. Useful for predefined pin configurations.
    /// # Example
    /// ```ignore
    /// let mut dr_enable = driver::ENABLE.init();
    /// dr_enable.set_high();
    /// ```
    pub fn init(&self) -> Pin {
        Pin::new(self.port, self.pin, self.mode)
    }
}

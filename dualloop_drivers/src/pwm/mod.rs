// Bipolar H-bridge PWM on TIM2, driven from the controller voltage command.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    clocks::Clocks,
    pac::TIM2,
    timer::{
        Alignment, CaptureCompareDma, CountDir, OutputCompare, TimChannel, Timer, TimerConfig,
        TimerInterrupt, UpdateReqSrc,
    },
};

use dualloop_algo::io::{voltage_to_duty, OutputStage};

use super::pinout;

pub struct HBridgePwm {
    tim: Timer<TIM2>,
    duty_ref: f32, // Duty at zero volts
}

impl HBridgePwm {
    pub fn new(tim2: TIM2, clock_cfg: &Clocks, freq: u16, duty_ref: f32) -> Self {
        // Center-aligned so the update interrupt fires at both overflow and underflow
        let mut timer = Timer::new_tim2(
            tim2,
            freq as f32,
            TimerConfig {
                one_pulse_mode: false,
                update_request_source: UpdateReqSrc::Any,
                auto_reload_preload: true,
                alignment: Alignment::Center1,
                capture_compare_dma: CaptureCompareDma::Update,
                direction: CountDir::Up,
            },
            clock_cfg,
        );
        timer.enable_interrupt(TimerInterrupt::Update);
        timer.enable();

        HBridgePwm {
            tim: timer,
            duty_ref,
        }
    }

    pub fn get_timer(&mut self) -> &mut Timer<TIM2> {
        &mut self.tim
    }

    pub fn begin(&mut self) {
        // Both legs low until the first command
        self.tim
            .enable_pwm_output(TimChannel::C1, OutputCompare::Pwm1, 0.0);
        self.tim
            .enable_pwm_output(TimChannel::C2, OutputCompare::Pwm1, 0.0);

        pinout::driver::PWM_POS.init();
        pinout::driver::PWM_NEG.init();
    }

    fn apply_duty(&mut self, pos: f32, neg: f32) {
        let period = self.tim.get_max_duty();
        self.tim
            .set_duty(TimChannel::C1, Self::duty2period(pos, period));
        self.tim
            .set_duty(TimChannel::C2, Self::duty2period(neg, period));
    }

    fn duty2period(duty: f32, period: u32) -> u32 {
        (duty.clamp(0.0, 1.0) * period as f32) as u32
    }
}

impl OutputStage for HBridgePwm {
    /// Complementary legs: the positive leg gets `duty`, the negative one `1 - duty`.
    fn apply_voltage(&mut self, voltage: f32, vdc: f32) {
        let duty = voltage_to_duty(voltage, vdc, self.duty_ref);
        self.apply_duty(duty, 1.0 - duty);
    }

    fn disable(&mut self) {
        self.apply_duty(0.0, 0.0);
    }
}

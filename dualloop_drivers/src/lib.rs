#![no_std]

pub mod adc_seq;
pub mod pinout;
pub mod pwm;

// ADC1 regular sequence covering every input of one control tick, read out by DMA.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    adc::{Adc, AdcDevice, AdcInterrupt, Align, InputType, SampleTime},
    clocks::Clocks,
    dma::{DmaChannel, DmaPeriph},
    pac::ADC1,
};

use crate::pinout;

const I_A1: u8 = 1;
const I_A3: u8 = 2;
const I_A4: u8 = 3;
const VREF_HIGH: u8 = 4;
const VREF_LOW: u8 = 5;

pub const SAMPLING_COUNT: usize = 5;
pub const ADC1_SEQUENCE: [u8; SAMPLING_COUNT] = [I_A1, I_A3, I_A4, VREF_HIGH, VREF_LOW];

/// DMA channel the sequence is transferred on.
pub const DMA_CHANNEL: DmaChannel = DmaChannel::C1;

pub struct AdcSequence {
    adc: Adc<ADC1>,
}

impl AdcSequence {
    pub fn new(adc1: ADC1, clock_cfg: &Clocks) -> Self {
        pinout::adc::I_A1.init();
        pinout::adc::I_A3.init();
        pinout::adc::I_A4.init();
        pinout::adc::VREF_HIGH.init();
        pinout::adc::VREF_LOW.init();

        let mut adc = Adc::new_adc1(adc1, AdcDevice::One, Default::default(), clock_cfg.systick());

        for (i, &ch) in ADC1_SEQUENCE.iter().enumerate() {
            adc.set_sequence(ch, i as u8 + 1);
            adc.set_input_type(ch, InputType::SingleEnded);
            adc.set_sample_time(ch, SampleTime::T2);
        }
        adc.set_sequence_len(SAMPLING_COUNT as u8);

        // Left aligned: 12-bit result in the upper bits of the 16-bit register
        adc.set_align(Align::Left);
        adc.enable_interrupt(AdcInterrupt::EndOfSequence);

        Self { adc }
    }

    /// Starts one conversion of the whole sequence into `buf`.
    ///
    /// # Safety
    /// `buf` is written by DMA after this returns and must not be read until the transfer
    /// complete interrupt fired.
    pub unsafe fn start(&mut self, buf: &mut [u16; SAMPLING_COUNT]) {
        self.adc.read_dma(
            buf,
            &ADC1_SEQUENCE,
            DMA_CHANNEL,
            Default::default(),
            DmaPeriph::Dma1,
        );
    }
}

/// Splits a finished sequence into the current sense channels (A1..A4, A2 not wired) and the two
/// reference channels.
pub fn split_sequence(buf: &[u16; SAMPLING_COUNT]) -> ([u16; 4], u16, u16) {
    ([buf[0], 0, buf[1], buf[2]], buf[3], buf[4])
}

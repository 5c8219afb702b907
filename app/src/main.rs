#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use core::sync::atomic::{AtomicBool, Ordering};

use hal::{
    self,
    clocks::Clocks,
    dma,
    dma::{Dma, DmaChannel, DmaInput, DmaInterrupt, DmaPeriph},
    gpio::Pin,
    pac,
    pac::DMA1,
    timer::TimerInterrupt,
};

use dualloop_algo::{
    analog::{SensorTrim, NUM_CALOFFSET},
    control::ControlMode,
    error::ControlError,
    io::{OutputStage, SampleSource},
    params::{init_parameters, TICK_HZ},
    sample_dump::{AdcFrame, SampleDump, ALL_FIELDS},
    scheduler::{TickGate, TickToken},
    DriverStatus, MotorController,
};

use dualloop_drivers::adc_seq;

use cortex_m;

static mut SAMPLES: SampleDump<ALL_FIELDS> = SampleDump::new();
static mut VOLTAGE: f32 = 0.0;
static FAULTED: AtomicBool = AtomicBool::new(false);
static TICK_GATE: TickGate = TickGate::new();

static mut ADC_READ_BUF: [u16; adc_seq::SAMPLING_COUNT] = [0; adc_seq::SAMPLING_COUNT];


// Current sensor trim: 1.5 V at zero current, 10 A/V
const SENSOR_TRIM: SensorTrim = SensorTrim {
    offset: 1.5,
    gain: 10.0,
};

// Current step applied once calibration completes [A]
const STEP_CURRENT: f32 = 2.0;

#[rtic::app(device = pac, peripherals = true, dispatchers = [TIM7])]
mod app {
    use super::*;

    use dualloop_drivers::*;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        stage: pwm::HBridgePwm,
        underflow: bool,
        vdc: f32,
        adc1: adc_seq::AdcSequence,
        dma1: Dma<DMA1>,
        motor: MotorController,
        overruns_seen: u32,
        led_ready: Pin,
        led_fault: Pin,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();

        let sysclk_freq = clock_cfg.sysclk(); // System clock frequency in Hz
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", sysclk_freq / 1000000);
        init_driver_pins();

        let params = init_parameters();
        let mut motor = MotorController::new(params, NUM_CALOFFSET, SENSOR_TRIM);
        motor.set_mode(ControlMode::Current);
        motor.start_reference(STEP_CURRENT, params.reference.time);

        let mut stage = pwm::HBridgePwm::new(
            dp.TIM2,
            &clock_cfg,
            TICK_HZ as u16,
            params.motor.duty_ref,
        );
        stage.begin();

        let dma1 = Dma::new(dp.DMA1);
        dma::enable_mux1();
        dma::mux(DmaPeriph::Dma1, adc_seq::DMA_CHANNEL, DmaInput::Adc1);

        let adc1 = adc_seq::AdcSequence::new(dp.ADC1, &clock_cfg);

        let mut led_ready = pinout::led::READY.init();
        led_ready.set_low();
        let mut led_fault = pinout::led::FAULT.init();
        led_fault.set_low();

        (
            Shared {},
            Local {
                stage,
                underflow: true,
                vdc: params.motor.vdc,
                adc1,
                dma1,
                motor,
                overruns_seen: 0,
                led_ready,
                led_fault,
            },
        )
    }

    fn init_driver_pins() {
        let mut dr_reset = pinout::driver::RESET.init();
        dr_reset.set_high();

        let mut dr_en = pinout::driver::ENABLE.init();
        dr_en.set_high();
    }

    #[task(binds = TIM2, local = [stage, underflow, vdc, adc1], priority = 3)]
    fn tim2_period_elapsed(cx: tim2_period_elapsed::Context) {
        // Clear the update interrupt flag
        cx.local
            .stage
            .get_timer()
            .clear_interrupt(TimerInterrupt::Update);

        // Toggle the underflow flag
        *cx.local.underflow = !*cx.local.underflow;

        // Once per PWM period: latch the last command and sample the next frame
        if *cx.local.underflow {
            if FAULTED.load(Ordering::Relaxed) {
                cx.local.stage.disable();
            } else {
                cx.local
                    .stage
                    .apply_voltage(unsafe { VOLTAGE }, *cx.local.vdc);
            }

            unsafe { cx.local.adc1.start(&mut ADC_READ_BUF) };
        }
    }

    #[task(binds = DMA1_CH1, local = [dma1], priority = 2)]
    fn adc_end_read(cx: adc_end_read::Context) {
        dma::clear_interrupt(
            DmaPeriph::Dma1,
            DmaChannel::C1,
            DmaInterrupt::TransferComplete,
        );
        cx.local.dma1.stop(DmaChannel::C1);

        let (phase, ref_high, ref_low) = adc_seq::split_sequence(unsafe { &ADC_READ_BUF });
        let frame = unsafe {
            SAMPLES.set_phase_adc(phase);
            SAMPLES.set_reference_adc(ref_high, ref_low);
            SAMPLES.sample()
        };

        if let Some(frame) = frame {
            // Held by the control task until its tick finishes
            match TICK_GATE.enter() {
                Ok(token) => {
                    // Still marked running: the frame is lost, the token released with it
                    if control_tick::spawn(token, frame).is_err() {
                        let err = TICK_GATE.record_overrun();
                        defmt::warn!("TICK: frame dropped: {}", err);
                    }
                }
                Err(err) => defmt::warn!("TICK: frame dropped: {}", err),
            }
        }
    }

    #[task(priority = 1, local = [motor, overruns_seen, led_ready, led_fault])]
    async fn control_tick(cx: control_tick::Context, _token: TickToken<'static>, frame: AdcFrame) {
        let motor = cx.local.motor;

        let overruns = TICK_GATE.overruns();
        if overruns != *cx.local.overruns_seen {
            *cx.local.overruns_seen = overruns;
            motor.latch_fault(ControlError::Overrun);
        }

        let voltage = match motor.tick(&frame) {
            Ok(voltage) => voltage,
            Err(_) => {
                FAULTED.store(true, Ordering::Relaxed);
                cx.local.led_fault.set_high();
                0.0
            }
        };
        unsafe { VOLTAGE = voltage };

        if motor.status() == DriverStatus::Ready {
            cx.local.led_ready.set_high();
        } else {
            cx.local.led_ready.set_low();
        }
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

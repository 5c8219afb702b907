use dualloop_algo::control::{CascadeController, CurrentLoop};
use dualloop_algo::params::init_parameters;
use dualloop_algo::reference::{ReferenceGenerator, Waveform};

#[test]
fn anti_windup_keeps_integral_bounded() {
    let params = init_parameters();
    let mut current = CurrentLoop::new(&params);
    let vdc = params.motor.vdc;

    // Unreachable reference with the motor stalled: the loop stays saturated throughout
    let mut prev = 0.0f32;
    for tick in 0..2_000 {
        assert_eq!(current.regulate(1_000.0, 0.0), vdc);
        let integral = current.pi().integral();
        assert!(integral.abs() <= vdc + 1e-3, "tick {}: integral {}", tick, integral);
        assert!(integral >= prev - 1e-6);
        prev = integral;
    }
    assert!(current.pi().is_saturated());
    assert!((current.pi().integral() - vdc).abs() < 0.1);
}

#[test]
fn saturation_clamps_exactly() {
    let params = init_parameters();
    let vdc = params.motor.vdc;

    let mut current = CurrentLoop::new(&params);
    assert_eq!(current.regulate(500.0, 0.0), vdc);
    assert!(current.pi().unsaturated() > vdc);

    let mut current = CurrentLoop::new(&params);
    assert_eq!(current.regulate(-500.0, 0.0), -vdc);
    assert!(current.pi().unsaturated() < -vdc);
}

#[test]
fn cascade_matches_manual_composition() {
    let params = init_parameters();
    let mut speed_first = CascadeController::new(&params);

    // Build up some state in both loops
    for i in 0..50 {
        let v = speed_first.voltage();
        speed_first.step_speed_loop(800.0, 0.5 + i as f32 * 0.01, v);
    }
    let mut manual = speed_first.clone();

    let sensed = 1.2;
    let voltage = speed_first.voltage();
    let v_cascade = speed_first.step_speed_loop(800.0, sensed, voltage);
    let current_ref = speed_first.current_reference();

    let v_manual = manual.step_current_loop(current_ref, sensed);
    assert_eq!(v_cascade, v_manual);
}

#[test]
fn step_reference_timing_at_control_rate() {
    let params = init_parameters();
    let mut gen = ReferenceGenerator::new(Waveform::Step, params.tick_hz, 2.0, 0.0);
    gen.start(Waveform::Step, 4.0, 2.0);

    for _ in 0..40_000 {
        assert_eq!(gen.tick(), 4.0);
    }
    assert!(gen.is_active());

    gen.tick();
    assert!(!gen.is_active());
    assert_eq!(gen.count(), 0);
}

#[test]
fn speed_loop_spins_simulated_motor() {
    // Forward Euler model of the motor, one step per control tick
    let params = init_parameters();
    let m = params.motor;
    let mut ctl = CascadeController::new(&params);

    let (mut i, mut w) = (0.0f32, 0.0f32); // [A], [rad/s]
    let target_rpm = 1_000.0;
    for _ in 0..60_000 {
        let v = ctl.voltage();
        let v = ctl.step_speed_loop(target_rpm, i, v);
        let di = (v - m.ra * i - m.ke * w) / m.la;
        let dw = m.kt * i / m.j;
        i += di * m.ts;
        w += dw * m.ts;
    }
    let rpm = w * dualloop_algo::params::RAD_S_TO_RPM;
    assert!((rpm - target_rpm).abs() < 50.0, "speed {} rpm", rpm);
}

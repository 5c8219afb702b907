use dualloop_algo::analog::{
    AdcCalibration, CalStage, ChannelOffsets, CurrentSense, SensorTrim,
    NUM_CALOFFSET,
};
use dualloop_algo::error::CalibrationError;

fn raw(code: u16) -> u16 {
    code << 4
}

#[test]
fn gain_offset_maps_references_to_nominal_voltages() {
    let (c_h, c_l) = (1650u16, 820u16);
    let mut cal = AdcCalibration::new(NUM_CALOFFSET);

    for _ in 0..NUM_CALOFFSET - 1 {
        assert_eq!(cal.accumulate_gain_offset_sample(raw(c_h), raw(c_l)), Ok(None));
    }
    let result = cal
        .accumulate_gain_offset_sample(raw(c_h), raw(c_l))
        .unwrap()
        .unwrap();

    assert_eq!(result.gain, cal.gain());
    assert!((cal.calibrated_volts(raw(c_h)).unwrap() - 1.25).abs() < 1e-4);
    assert!((cal.calibrated_volts(raw(c_l)).unwrap() - 0.625).abs() < 1e-4);
    assert!((result.gain_error - (1.0 - result.gain).abs()).abs() < 1e-7);
}

#[test]
fn window_resets_after_each_stage() {
    let mut cal = AdcCalibration::new(NUM_CALOFFSET);
    for _ in 0..NUM_CALOFFSET {
        cal.accumulate_gain_offset_sample(raw(1706), raw(853)).unwrap();
    }
    assert_eq!(cal.stage(), CalStage::GainOffsetDone);
    assert_eq!(cal.accumulators(), (0, 0));
    assert_eq!(cal.sample_count(), 0);

    // The channel stage starts a fresh window: one sample never completes it
    let mut channels = ChannelOffsets::new();
    assert_eq!(channels.accumulate(&mut cal, raw(2048), raw(2000), raw(2100)), Ok(None));
    assert_eq!(cal.stage(), CalStage::GainOffsetDone);
    assert_eq!(cal.sample_count(), 1);

    for _ in 1..NUM_CALOFFSET - 1 {
        assert_eq!(channels.accumulate(&mut cal, raw(2048), raw(2000), raw(2100)), Ok(None));
    }
    let offsets = channels
        .accumulate(&mut cal, raw(2048), raw(2000), raw(2100))
        .unwrap()
        .unwrap();
    assert_eq!(cal.stage(), CalStage::ChannelOffsetDone);
    assert_eq!(cal.sample_count(), 0);
    assert_eq!(channels.sums(), [0; 4]);

    let gain = cal.gain();
    assert!((offsets[0] - 2048.0 * gain).abs() < 0.01);
    assert_eq!(offsets[1], 0.0);
    assert!((offsets[2] - 2000.0 * gain).abs() < 0.01);
    assert!((offsets[3] - 2100.0 * gain).abs() < 0.01);
}

#[test]
fn reversed_references_are_rejected() {
    let mut cal = AdcCalibration::new(8);
    let mut result = Ok(None);
    for _ in 0..8 {
        result = cal.accumulate_gain_offset_sample(raw(853), raw(1706));
    }
    assert!(matches!(result, Err(CalibrationError::DegenerateReference { .. })));
    assert_eq!(cal.stage(), CalStage::Uncalibrated);
    assert!(!cal.is_calibrated());
}

#[test]
fn conditioning_needs_gain_offset() {
    let trim = SensorTrim {
        offset: 1.5,
        gain: 10.0,
    };
    let mut sense = CurrentSense::new(trim);
    let mut cal = AdcCalibration::new(1);
    assert_eq!(sense.tick(&cal, raw(2048)), Err(CalibrationError::NotCalibrated));

    cal.accumulate_gain_offset_sample(raw(1706), raw(853)).unwrap();
    let amps = sense.tick(&cal, raw(2048)).unwrap();
    let expected = (2048.0 * 3.0 / 4096.0 - 1.5) * 10.0;
    assert!((amps - expected).abs() < 1e-3);
    assert_eq!(sense.sensed(), amps);
}

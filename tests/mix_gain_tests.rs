//! Dry/wet mix and output gain tests

mod helpers;

use approx::assert_relative_eq;
use helpers::tolerances::*;
use helpers::*;
use spectra::prelude::*;

/// mix = 0 plays the dry input, delayed to stay aligned with the wet path.
#[test]
fn test_dry_only_is_exact() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.5);
    engine.parameters().set_mix(0.0).unwrap();
    // A wet path that would be obvious if it leaked through.
    engine.effects_mut().set_module_enabled(0, 0, true).unwrap();

    let input = generate_noise(4096, 11);
    let output = process(&mut engine, &[input.clone(), input.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&input, &output[1], 512, 1.0, 0..4096);
    assert!(error <= FLOAT_EPSILON, "dry path deviates by {error}");
}

#[test]
fn test_gain_scales_output() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.5);
    engine.parameters().set_gain(0.5).unwrap();

    let input = generate_test_signal(4096);
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&input, &output[0], 512, 0.5, 0..4096);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

/// Half mix of a muted wet path halves the dry signal.
#[test]
fn test_half_mix_blends_dry_and_wet() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.5);
    engine.effects_mut().set_module_enabled(0, 0, true).unwrap();
    engine.parameters().set_mix(0.5).unwrap();

    let input = generate_test_signal(4096);
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&input, &output[0], 512, 0.5, 0..4096);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

/// Mix and gain changes apply from the next callback, without waiting for
/// a block boundary.
#[test]
fn test_parameters_apply_per_callback() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.5);
    let parameters = engine.parameters().clone();
    let input = generate_test_signal(4096);

    let output = process_with(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE, |_, offset| {
        if offset == 2048 {
            parameters.set_gain(2.0).unwrap();
        }
    });
    let before = max_delayed_error(&input, &output[0], 512, 1.0, 0..2048);
    let after = max_delayed_error(&input, &output[0], 512, 2.0, 2048..4096);
    assert!(before < DSP_EPSILON && after < 2.0 * DSP_EPSILON, "{before} / {after}");
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let engine = identity_engine(9, WindowType::Hann, 0.5);
    let parameters = engine.parameters();
    assert!(matches!(
        parameters.set_mix(1.5),
        Err(Error::InvalidParameter { name: "mix", .. })
    ));
    assert!(parameters.set_gain(-1.0).is_err());
    assert_relative_eq!(parameters.mix(), 1.0);
    assert_relative_eq!(parameters.gain(), 1.0);
}

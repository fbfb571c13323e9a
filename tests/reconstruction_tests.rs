//! STFT reconstruction tests
//!
//! With an identity lane graph the wet path must reproduce the input,
//! delayed by exactly one block, for every window whose overlap sums to a
//! constant.

mod helpers;

use helpers::tolerances::*;
use helpers::*;
use spectra::prelude::*;
use spectra::MAX_OVERLAP;

// =============================================================================
// Identity
// =============================================================================

/// Order 10, Hann, overlap 0.5: output equals input delayed by the
/// processing delay.
#[test]
fn test_identity_is_delayed_input() {
    init_tracing();
    let mut engine = identity_engine(10, WindowType::Hann, 0.5);
    let delay = engine.processing_delay();
    assert_eq!(delay, 1024);

    let left = generate_test_signal(8192);
    let right = generate_noise(8192, 7);
    let output = process(&mut engine, &[left.clone(), right.clone()], 2, TEST_BUFFER_SIZE);

    assert_silence(&output[0][..delay], FLOAT_EPSILON);
    let error = max_delayed_error(&left, &output[0], delay, 1.0, delay..8192);
    assert!(error < DSP_EPSILON, "left deviates by {error}");
    let error = max_delayed_error(&right, &output[1], delay, 1.0, delay..8192);
    assert!(error < DSP_EPSILON, "right deviates by {error}");
}

/// Callback sizes that do not divide the hop still line up.
#[test]
fn test_identity_with_uneven_callbacks() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.75);
    let input = generate_test_signal(6000);
    let output = process(&mut engine, &[input.clone()], 2, 77);

    let error = max_delayed_error(&input, &output[0], 512, 1.0, 0..6000);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

/// Callbacks larger than the internal chunk are split.
#[test]
fn test_identity_with_large_callbacks() {
    let mut engine = identity_engine(8, WindowType::Hamming, 0.5);
    let input = generate_noise(4096, 3);
    let output = process(&mut engine, &[input.clone()], 2, 1000);

    let error = max_delayed_error(&input, &output[0], 256, 1.0, 0..4096);
    assert!(error < DSP_EPSILON, "deviates by {error}");
    assert_silence(&output[1][..256], FLOAT_EPSILON);
}

// =============================================================================
// Overlap Scaling
// =============================================================================

const OVERLAPS: [f32; 5] = [0.0, 0.5, 0.75, 0.875, MAX_OVERLAP];

/// From each window's constant-overlap-add threshold on, DC comes back
/// exactly. Below it blocks are left unscaled and never exceed the input.
#[test]
fn test_constant_amplitude_for_all_windows() {
    let input = generate_dc(0.5, 6144);
    for window in WindowType::ALL {
        for overlap in OVERLAPS {
            let mut engine = identity_engine(10, window, overlap);
            let output = process(&mut engine, &[input.clone(), input.clone()], 2, TEST_BUFFER_SIZE);
            if overlap >= window.min_overlap() {
                let error = max_delayed_error(&input, &output[0], 1024, 1.0, 0..6144);
                assert!(
                    error < DSP_EPSILON,
                    "{window:?} at overlap {overlap} deviates by {error}"
                );
            } else {
                let level = peak(&output[0]);
                assert!(
                    level <= 0.5 + DSP_EPSILON,
                    "{window:?} at overlap {overlap} peaks at {level}"
                );
                assert_has_audio(&output[0][2048..], 0.1);
            }
        }
    }
}

/// A lane that only rotates phases keeps a sine's level at every overlap.
#[test]
fn test_phase_shift_keeps_level_at_low_overlap() {
    let input: Vec<f32> = generate_sine(440.0, TEST_SAMPLE_RATE, 8192)
        .iter()
        .map(|s| 0.5 * s)
        .collect();
    for window in [WindowType::Hann, WindowType::Blackman] {
        for overlap in [0.0, 0.5] {
            let mut engine = engine_builder(10, window, overlap).build().unwrap();
            let effects = engine.effects_mut();
            let lane = effects.add_lane().unwrap();
            effects
                .insert_module(
                    lane,
                    0,
                    "phase_shift",
                    &effect_params! { "shift" => 1.5, "dispersion" => 0.3 },
                )
                .unwrap();

            let output = process(&mut engine, &[input.clone(), input.clone()], 2, TEST_BUFFER_SIZE);
            let settled = &output[0][2048..];
            let level = peak(settled);
            assert!(level < 0.6, "{window:?} at overlap {overlap} peaks at {level}");
            assert_has_audio(settled, 0.1);
        }
    }
}

/// Rectangular blocks also reconstruct without any overlap.
#[test]
fn test_rectangular_without_overlap() {
    let mut engine = identity_engine(10, WindowType::Rectangular, 0.0);
    assert_eq!(engine.layout().hop(), 1024);
    let input = generate_test_signal(5000);
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);

    let error = max_delayed_error(&input, &output[0], 1024, 1.0, 0..5000);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

// =============================================================================
// Wet Path Without Lanes
// =============================================================================

#[test]
fn test_no_lanes_is_silent_when_fully_wet() {
    let mut engine = engine_builder(9, WindowType::Hann, 0.5).build().unwrap();
    let input = generate_test_signal(4096);
    let output = process(&mut engine, &[input.clone(), input], 2, TEST_BUFFER_SIZE);
    assert_silence(&output[0], FLOAT_EPSILON);
    assert_silence(&output[1], FLOAT_EPSILON);
}

#[test]
fn test_reset_restarts_the_stream() {
    let mut engine = identity_engine(8, WindowType::Hann, 0.5);
    let input = generate_test_signal(2048);
    process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);

    engine.reset();
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);
    assert_silence(&output[0][..256], FLOAT_EPSILON);
    let error = max_delayed_error(&input, &output[0], 256, 1.0, 0..2048);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

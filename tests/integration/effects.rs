//! Effects processing a live stream
//!
//! Built-in effects and user-registered effects inside lanes.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use spectra::core::ComplexWord;
use spectra::prelude::*;
use spectra::{ComplexFormat, EffectParameters, RunContext};

/// Flips the sign of every bin.
struct Invert;

impl SpectralEffect for Invert {
    fn name(&self) -> &'static str {
        "invert"
    }

    fn format(&self) -> ComplexFormat {
        ComplexFormat::Cartesian
    }

    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        _parameters: &EffectParameters,
        _context: &RunContext,
    ) {
        for (d, s) in destination.iter_mut().zip(source) {
            *d = -*s;
        }
    }
}

#[test]
fn test_registered_effect_runs_in_lane() {
    let registry = EffectRegistry::default();
    registry.register("invert", || Box::new(Invert));
    let mut engine = engine_builder(9, WindowType::Hann, 0.5)
        .registry(registry)
        .build()
        .unwrap();
    let lane = engine.effects_mut().add_lane().unwrap();
    engine
        .effects_mut()
        .insert_module(lane, 0, "invert", &EffectParams::new())
        .unwrap();

    let input = generate_test_signal(4096);
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&input, &output[0], 512, -1.0, 0..4096);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

#[test]
fn test_unknown_effect_is_rejected() {
    let mut engine = engine_builder(9, WindowType::Hann, 0.5).build().unwrap();
    let lane = engine.effects_mut().add_lane().unwrap();
    assert!(engine
        .effects_mut()
        .insert_module(lane, 0, "invert", &EffectParams::new())
        .is_err());
}

/// A low-pass filter removes the upper tone of the test signal and leaves
/// the offset and the lower tone.
#[test]
fn test_filter_removes_upper_tone() {
    let mut engine = engine_builder(10, WindowType::Hann, 0.5).build().unwrap();
    let effects = engine.effects_mut();
    let lane = effects.add_lane().unwrap();
    effects
        .insert_module(
            lane,
            0,
            "filter",
            &effect_params! { "low_hz" => 10.0, "high_hz" => 1000.0 },
        )
        .unwrap();

    let len = 8192;
    let input = generate_test_signal(len);
    let low = generate_sine(187.5, TEST_SAMPLE_RATE, len);
    let expected: Vec<f32> = low.iter().map(|l| 0.1 + 0.4 * l).collect();

    let output = process(&mut engine, &[input], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&expected, &output[0], 1024, 1.0, 2048..len);
    assert!(error < PERCEPTUAL_EPSILON, "filtered output deviates by {error}");
}

/// Module mix blends the effect with the module's own input.
#[test]
fn test_module_mix_blends_chain_stage() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.5);
    let effects = engine.effects_mut();
    effects.set_module_enabled(0, 0, true).unwrap();
    effects.set_module_mix(0, 0, 0.25).unwrap();

    let input = generate_test_signal(4096);
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&input, &output[0], 512, 0.75, 0..4096);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

/// Reordering a chain of linear effects does not change the result.
#[test]
fn test_moving_modules_keeps_linear_chain() {
    let mut engine = engine_builder(9, WindowType::Hann, 0.5).build().unwrap();
    let effects = engine.effects_mut();
    let lane = effects.add_lane().unwrap();
    effects
        .insert_module(lane, 0, "gain", &effect_params! { "gain" => 2.0 })
        .unwrap();
    effects
        .insert_module(lane, 1, "gain", &effect_params! { "gain" => 0.25 })
        .unwrap();
    effects.move_module(lane, 1, 0).unwrap();
    assert_eq!(effects.module_parameters(lane, 0).unwrap().get("gain").unwrap(), 0.25);

    let input = generate_test_signal(4096);
    let output = process(&mut engine, &[input.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&input, &output[0], 512, 0.5, 0..4096);
    assert!(error < DSP_EPSILON, "deviates by {error}");
}

//! Test helpers and fixtures for spectra integration tests
//!
//! Engines are driven callback by callback with deterministic signals, so
//! every run is reproducible.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (dry path, unity gain)
//! - `DSP_EPSILON` (1e-4): STFT round trips
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use spectra::prelude::*;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Callback size used by [`process`].
pub const TEST_BUFFER_SIZE: usize = 256;

/// Install a test-friendly tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Engine with one FFT order range wide enough for the tests.
pub fn engine_builder(fft_order: u32, window: WindowType, overlap: f32) -> SoundEngineBuilder {
    SoundEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .fft_order_range(5, 12)
        .fft_order(fft_order)
        .window(window)
        .overlap(overlap)
        .max_block_size(TEST_BUFFER_SIZE)
}

/// Engine with a single lane from the main input to the main output whose
/// only module is disabled, so the wet path reproduces the input.
pub fn identity_engine(fft_order: u32, window: WindowType, overlap: f32) -> SoundEngine {
    let mut engine = engine_builder(fft_order, window, overlap)
        .build()
        .expect("Failed to create test engine");
    let effects = engine.effects_mut();
    let lane = effects.add_lane().unwrap();
    effects
        .insert_module(lane, 0, "gain", &effect_params! { "gain" => 0.0 })
        .unwrap()
        .set_enabled(false);
    engine
}

/// Run `inputs` through `engine` in callbacks of `chunk` samples, returning
/// `outputs` channels.
pub fn process(engine: &mut SoundEngine, inputs: &[Vec<f32>], outputs: usize, chunk: usize) -> Vec<Vec<f32>> {
    process_with(engine, inputs, outputs, chunk, |_, _| {})
}

/// Like [`process`], calling `before(engine, offset)` ahead of every callback.
pub fn process_with(
    engine: &mut SoundEngine,
    inputs: &[Vec<f32>],
    outputs: usize,
    chunk: usize,
    mut before: impl FnMut(&mut SoundEngine, usize),
) -> Vec<Vec<f32>> {
    let len = inputs[0].len();
    let channels = inputs.len().max(outputs);
    let mut result = vec![Vec::with_capacity(len); outputs];

    let mut offset = 0;
    while offset < len {
        let samples = chunk.min(len - offset);
        before(engine, offset);
        engine.update_parameters(UpdatePhase::BeforeProcess, TEST_SAMPLE_RATE as f32, false);

        let mut buffers: Vec<Vec<f32>> = (0..channels)
            .map(|c| match inputs.get(c) {
                Some(input) => input[offset..offset + samples].to_vec(),
                None => vec![0.0; samples],
            })
            .collect();
        {
            let mut refs: Vec<&mut [f32]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
            engine.process(&mut refs, samples, inputs.len(), outputs);
        }
        engine.update_parameters(UpdatePhase::AfterProcess, TEST_SAMPLE_RATE as f32, false);

        for (out, buffer) in result.iter_mut().zip(&buffers) {
            out.extend_from_slice(buffer);
        }
        offset += samples;
    }
    result
}

/// `output[i]` should equal `scale * input[i - delay]`. Returns the largest
/// deviation over `range`.
pub fn max_delayed_error(
    input: &[f32],
    output: &[f32],
    delay: usize,
    scale: f32,
    range: std::ops::Range<usize>,
) -> f32 {
    range
        .map(|i| {
            let expected = if i >= delay { scale * input[i - delay] } else { 0.0 };
            (output[i] - expected).abs()
        })
        .fold(0.0, f32::max)
}

// =============================================================================
// Deterministic Signal Generators
// =============================================================================

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 4.0 - 1.0
        })
        .collect()
}

/// Generate a DC signal.
pub fn generate_dc(value: f32, num_samples: usize) -> Vec<f32> {
    vec![value; num_samples]
}

/// Two tones and an offset: exercises low and high bins at once.
pub fn generate_test_signal(num_samples: usize) -> Vec<f32> {
    let low = generate_sine(187.5, TEST_SAMPLE_RATE, num_samples);
    let high = generate_sine(5250.0, TEST_SAMPLE_RATE, num_samples);
    low.iter()
        .zip(&high)
        .map(|(l, h)| 0.1 + 0.4 * l + 0.2 * h)
        .collect()
}

// =============================================================================
// Signal Measurements
// =============================================================================

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

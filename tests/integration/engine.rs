//! Engine lifecycle integration tests
//!
//! Creation, worker start and shutdown, and reset between streams.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use spectra::prelude::*;

/// Engines with worker threads can be created and dropped back to back.
#[test]
fn test_engine_sequential_creation() {
    init_tracing();
    for workers in 0..4 {
        let engine = engine_builder(9, WindowType::Hann, 0.5)
            .worker_threads(workers)
            .wait_mechanism(WaitMechanism::WaitNotify)
            .build()
            .unwrap();
        assert_eq!(engine.effects().worker_count(), workers);
        // Dropping joins the workers.
    }
}

#[test]
fn test_engine_reports_layout() {
    let engine = engine_builder(10, WindowType::Hamming, 0.75).build().unwrap();
    assert_eq!(engine.layout().size(), 1024);
    assert_eq!(engine.layout().hop(), 256);
    assert_eq!(engine.layout().bin_count(), 513);
    assert_eq!(engine.processing_delay(), 1024);
    assert!(!format!("{engine:?}").is_empty());
}

/// A reset engine treats the next callback as the start of a new stream.
#[test]
fn test_reset_between_streams() {
    let mut engine = identity_engine(9, WindowType::Hann, 0.5);
    let first = generate_noise(4096, 5);
    process(&mut engine, &[first], 2, TEST_BUFFER_SIZE);

    engine.reset();
    let second = generate_test_signal(4096);
    let output = process(&mut engine, &[second.clone()], 2, TEST_BUFFER_SIZE);
    let error = max_delayed_error(&second, &output[0], 512, 1.0, 0..4096);
    assert!(error < DSP_EPSILON, "stale samples after reset: {error}");
}

/// The same stream through engines with and without workers comes out the
/// same.
#[test]
fn test_workers_do_not_change_the_result() {
    let input = generate_noise(8192, 21);
    let build = |workers: usize| {
        let mut engine = engine_builder(9, WindowType::Hann, 0.75)
            .worker_threads(workers)
            .build()
            .unwrap();
        let effects = engine.effects_mut();
        for _ in 0..3 {
            let lane = effects.add_lane().unwrap();
            effects
                .insert_module(lane, 0, "gain", &effect_params! { "gain" => 0.5 })
                .unwrap();
        }
        engine
    };

    let single = process(&mut build(0), &[input.clone()], 2, TEST_BUFFER_SIZE);
    let pooled = process(&mut build(3), &[input], 2, TEST_BUFFER_SIZE);
    for (a, b) in single[0].iter().zip(&pooled[0]) {
        assert!((a - b).abs() <= FLOAT_EPSILON);
    }
}

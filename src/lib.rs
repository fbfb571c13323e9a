//! # Spectra - Real-time Spectral Effects
//!
//! Streaming STFT engine that runs every block through a graph of effect
//! lanes.
//!
//! ## Architecture
//!
//! Spectra is an umbrella crate that coordinates:
//! - **spectra-core** - Primitives (ring and SIMD buffers, spin/wait locks, FFT, windows)
//! - **spectra-effects** - Spectral effects, lanes and the lane scheduler
//!
//! ## Quick Start
//!
//! ```ignore
//! use spectra::prelude::*;
//!
//! let mut engine = SoundEngine::builder()
//!     .sample_rate(44100.0)
//!     .fft_order(10)
//!     .overlap(0.75)
//!     .build()?;
//!
//! // One lane: main input through a band-pass into the main output
//! let lane = engine.effects_mut().add_lane()?;
//! engine.effects_mut().insert_module(
//!     lane,
//!     0,
//!     "filter",
//!     &effect_params! { "low_hz" => 300.0, "high_hz" => 3000.0 },
//! )?;
//!
//! // Audio callback
//! engine.update_parameters(UpdatePhase::BeforeProcess, 44100.0, false);
//! engine.process(&mut channels, frames, 2, 2);
//! ```

/// Re-export of spectra-core for direct access
pub use spectra_core as core;

/// Re-export of spectra-effects for direct access
pub use spectra_effects as effects;

mod builder;
mod config;
mod engine;
mod error;
mod params;

pub use builder::SoundEngineBuilder;
pub use config::{EngineConfig, MAX_CHANNELS};
pub use engine::{BlockLayout, SoundEngine, UpdatePhase, MAX_OVERLAP};
pub use error::{Error, Result};
pub use params::EngineParameters;

// Core types
pub use spectra_core::{WaitMechanism, Window, WindowType, MAX_FFT_ORDER, MIN_FFT_ORDER};

// Effects
pub use spectra_effects::{
    effect_params, ComplexFormat, EffectKind, EffectParameters, EffectParams, EffectRegistry,
    EffectsState, LaneGraphError, LaneInput, LaneOutput, LaneSettings, LaneStatus, ParamSpec,
    RunContext, SpectralEffect,
};

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        effect_params, BlockLayout, EffectKind, EffectParams, EffectRegistry, EngineConfig,
        EngineParameters, Error, LaneInput, LaneOutput, Result, SoundEngine, SoundEngineBuilder,
        SpectralEffect, UpdatePhase, WaitMechanism, WindowType,
    };
}

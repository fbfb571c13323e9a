//! Spectral effects and the lane scheduler.
//!
//! # Primary API
//!
//! - [`EffectsState`]: lanes of effect modules, run concurrently once per block
//! - [`EffectRegistry`]: creates effects from string identifiers
//! - [`SpectralEffect`]: the trait every effect implements
//!
//! # Example
//!
//! ```ignore
//! use spectra_effects::*;
//!
//! let mut state = EffectsState::new(EffectsConfig::default())?;
//! let lane = state.add_lane()?;
//! state.insert_module(lane, 0, "gain", &effect_params! { "gain" => 0.5 })?;
//! ```

pub mod effect;
pub mod effects;
pub mod error;
pub mod lane;
pub mod module;
pub mod registry;
pub mod routing;
pub mod source;
pub mod state;
mod worker;

pub use effect::{ComplexFormat, EffectParameters, ParamSpec, RunContext, SpectralEffect};
pub use effects::EffectKind;
pub use error::{EffectsError, LaneGraphError, Result};
pub use lane::{EffectsLane, LaneSettings, LaneStatus};
pub use module::EffectModule;
pub use registry::{EffectConstructor, EffectParams, EffectRegistry};
pub use routing::{LaneInput, LaneOutput};
pub use source::ComplexDataSource;
pub use state::{EffectsConfig, EffectsState};

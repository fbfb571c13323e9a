//! Centralized error type for the spectra umbrella crate.
//!
//! Wraps the sub-crate errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] spectra_core::Error),

    #[error(transparent)]
    Effects(#[from] spectra_effects::EffectsError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid value {value} for parameter '{name}'")]
    InvalidParameter { name: &'static str, value: f32 },
}

pub type Result<T> = std::result::Result<T, Error>;

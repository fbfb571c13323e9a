//! Error types for spectra-effects.

use thiserror::Error;

/// Error type for lane and module edits.
#[derive(Error, Debug)]
pub enum EffectsError {
    #[error("Unknown effect type: {0}")]
    UnknownEffect(String),

    #[error("Unknown parameter '{parameter}' for effect '{effect}'")]
    UnknownParameter { effect: String, parameter: String },

    #[error("Invalid value {value} for parameter '{parameter}'")]
    InvalidParameter { parameter: String, value: f32 },

    #[error("Lane index {index} out of range ({count} lanes)")]
    LaneIndex { index: usize, count: usize },

    #[error("Module index {index} out of range ({count} modules in lane {lane})")]
    ModuleIndex {
        lane: usize,
        index: usize,
        count: usize,
    },

    #[error(transparent)]
    LaneGraph(#[from] LaneGraphError),

    #[error("Invalid effects config: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn lane worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Rejected lane routing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaneGraphError {
    #[error("Lane {lane} reads its own output")]
    SelfInput { lane: usize },

    #[error("Lane {lane} reads missing lane {input}")]
    MissingLane { lane: usize, input: usize },

    #[error("Lane {lane} is part of a cycle")]
    Cycle { lane: usize },

    #[error("Lane {lane} uses sidechain {sidechain}, but only {available} are configured")]
    MissingSidechain {
        lane: usize,
        sidechain: usize,
        available: usize,
    },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, EffectsError>;

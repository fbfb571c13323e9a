//! Integration test modules for spectra
//!
//! - engine: engine lifecycle, worker threads, reset
//! - effects: effect chains processing a real stream

pub mod effects;
pub mod engine;

//! Error types for spectra-core.

use thiserror::Error;

/// Error type for spectra-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid FFT order range: {min}..={max} (supported {lo}..={hi})", lo = crate::MIN_FFT_ORDER, hi = crate::MAX_FFT_ORDER)]
    InvalidOrderRange { min: u32, max: u32 },

    #[error("FFT order {order} outside planned range {min}..={max}")]
    OrderNotPlanned { order: u32, min: u32, max: u32 },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

//! Real-input FFT planned for a range of orders.
//!
//! All plans and scratch space are created up front so switching the order
//! on the audio thread never allocates.

use crate::{Error, Result, MAX_FFT_ORDER, MIN_FFT_ORDER};
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

pub use realfft::num_complex::Complex32;

/// Forward and inverse real FFTs for every order in `min_order..=max_order`.
pub struct FourierTransform {
    min_order: u32,
    max_order: u32,
    forward: Vec<Arc<dyn RealToComplex<f32>>>,
    inverse: Vec<Arc<dyn ComplexToReal<f32>>>,
    scratch: Vec<Complex32>,
}

impl FourierTransform {
    pub fn new(min_order: u32, max_order: u32) -> Result<Self> {
        if min_order < MIN_FFT_ORDER || max_order > MAX_FFT_ORDER || min_order > max_order {
            return Err(Error::InvalidOrderRange {
                min: min_order,
                max: max_order,
            });
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let mut forward = Vec::new();
        let mut inverse = Vec::new();
        let mut scratch_len = 0;
        for order in min_order..=max_order {
            let size = 1usize << order;
            let r2c = planner.plan_fft_forward(size);
            let c2r = planner.plan_fft_inverse(size);
            scratch_len = scratch_len
                .max(r2c.get_scratch_len())
                .max(c2r.get_scratch_len());
            forward.push(r2c);
            inverse.push(c2r);
        }

        tracing::debug!(min_order, max_order, "planned real FFTs");

        Ok(Self {
            min_order,
            max_order,
            forward,
            inverse,
            scratch: vec![Complex32::default(); scratch_len],
        })
    }

    #[inline]
    pub fn min_order(&self) -> u32 {
        self.min_order
    }

    #[inline]
    pub fn max_order(&self) -> u32 {
        self.max_order
    }

    /// Whether `order` was planned.
    #[inline]
    pub fn supports(&self, order: u32) -> bool {
        (self.min_order..=self.max_order).contains(&order)
    }

    /// Check that `order` was planned.
    pub fn check_order(&self, order: u32) -> Result<()> {
        if self.supports(order) {
            Ok(())
        } else {
            Err(Error::OrderNotPlanned {
                order,
                min: self.min_order,
                max: self.max_order,
            })
        }
    }

    #[inline]
    fn slot(&self, order: u32) -> usize {
        assert!(self.supports(order), "FFT order {order} was not planned");
        (order - self.min_order) as usize
    }

    /// Spectrum of `2^order` real samples into `2^(order-1) + 1` bins.
    ///
    /// `samples` is used as scratch and left unspecified.
    pub fn forward(&mut self, order: u32, samples: &mut [f32], spectrum: &mut [Complex32]) {
        let slot = self.slot(order);
        let size = 1usize << order;
        if let Err(error) = self.forward[slot].process_with_scratch(
            &mut samples[..size],
            &mut spectrum[..size / 2 + 1],
            &mut self.scratch,
        ) {
            panic!("forward FFT of order {order}: {error}");
        }
    }

    /// Samples of a spectrum, scaled by `1 / 2^order` so that
    /// `inverse(forward(x)) == x`.
    ///
    /// The imaginary parts of the DC and Nyquist bins are ignored. `spectrum`
    /// is used as scratch and left unspecified.
    pub fn inverse(&mut self, order: u32, spectrum: &mut [Complex32], samples: &mut [f32]) {
        let slot = self.slot(order);
        let size = 1usize << order;
        let bins = size / 2 + 1;
        spectrum[0].im = 0.0;
        spectrum[bins - 1].im = 0.0;
        if let Err(error) = self.inverse[slot].process_with_scratch(
            &mut spectrum[..bins],
            &mut samples[..size],
            &mut self.scratch,
        ) {
            panic!("inverse FFT of order {order}: {error}");
        }
        let norm = 1.0 / size as f32;
        for sample in &mut samples[..size] {
            *sample *= norm;
        }
    }
}

impl std::fmt::Debug for FourierTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FourierTransform")
            .field("min_order", &self.min_order)
            .field("max_order", &self.max_order)
            .finish()
    }
}

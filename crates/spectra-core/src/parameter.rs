//! Value ranges for effect and engine parameters.
//!
//! Controls store real values; [`ParameterRange`] clamps and quantizes them and
//! maps them to a normalized 0..1 position for host-facing controls.

use serde::{Deserialize, Serialize};

/// Mapping between a real value and its normalized position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ParameterScale {
    /// `real = min + normalized * (max - min)`
    #[default]
    Linear,
    /// `real = min * (max / min)^normalized`, for frequencies. Requires `min > 0`.
    Logarithmic,
    /// `min` below the midpoint, `max` at or above it.
    Toggle,
    /// Whole steps between `min` and `max`.
    Integer,
}

/// Valid range, default and scaling of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub scale: ParameterScale,
}

impl ParameterRange {
    pub fn new(min: f32, max: f32, default: f32, scale: ParameterScale) -> Self {
        debug_assert!(max > min, "max must be greater than min");
        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f32, max: f32, default: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    pub fn logarithmic(min: f32, max: f32, default: f32) -> Self {
        debug_assert!(min > 0.0, "logarithmic scale requires min > 0");
        Self::new(min, max, default, ParameterScale::Logarithmic)
    }

    pub fn toggle(default_on: bool) -> Self {
        Self::new(0.0, 1.0, if default_on { 1.0 } else { 0.0 }, ParameterScale::Toggle)
    }

    pub fn integer(min: i32, max: i32, default: i32) -> Self {
        Self::new(min as f32, max as f32, default as f32, ParameterScale::Integer)
    }

    /// Whether `value` is a legal setting (finite and inside the range).
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Clamp into range and snap to the scale's steps.
    #[inline]
    pub fn constrain(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.default } else { value.clamp(self.min, self.max) };
        match self.scale {
            ParameterScale::Linear | ParameterScale::Logarithmic => value,
            ParameterScale::Integer => value.round(),
            ParameterScale::Toggle => {
                if value >= (self.min + self.max) * 0.5 {
                    self.max
                } else {
                    self.min
                }
            }
        }
    }

    /// Real value to 0..1.
    pub fn normalize(&self, value: f32) -> f32 {
        let value = self.constrain(value);
        match self.scale {
            ParameterScale::Logarithmic => {
                (value.ln() - self.min.ln()) / (self.max.ln() - self.min.ln())
            }
            _ => (value - self.min) / (self.max - self.min),
        }
    }

    /// 0..1 to a real value.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let value = match self.scale {
            ParameterScale::Logarithmic => {
                (self.min.ln() + normalized * (self.max.ln() - self.min.ln())).exp()
            }
            _ => self.min + normalized * (self.max - self.min),
        };
        self.constrain(value)
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}

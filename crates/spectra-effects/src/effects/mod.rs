//! Built-in spectral effects.

mod contrast;
mod filter;
mod freeze;
mod gain;
mod phase_shift;

pub use contrast::SpectralContrast;
pub use filter::SpectralFilter;
pub use freeze::SpectralFreeze;
pub use gain::SpectralGain;
pub use phase_shift::PhaseShift;

use crate::{EffectRegistry, SpectralEffect};
use serde::{Deserialize, Serialize};

/// The built-in effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Gain,
    Filter,
    PhaseShift,
    Contrast,
    Freeze,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        Self::Gain,
        Self::Filter,
        Self::PhaseShift,
        Self::Contrast,
        Self::Freeze,
    ];

    /// Registry identifier.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gain => SpectralGain::NAME,
            Self::Filter => SpectralFilter::NAME,
            Self::PhaseShift => PhaseShift::NAME,
            Self::Contrast => SpectralContrast::NAME,
            Self::Freeze => SpectralFreeze::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn create(self) -> Box<dyn SpectralEffect> {
        match self {
            Self::Gain => Box::new(SpectralGain),
            Self::Filter => Box::new(SpectralFilter),
            Self::PhaseShift => Box::new(PhaseShift),
            Self::Contrast => Box::new(SpectralContrast),
            Self::Freeze => Box::new(SpectralFreeze::new()),
        }
    }
}

/// Register every built-in effect under its name.
pub fn register_builtin_effects(registry: &EffectRegistry) {
    for kind in EffectKind::ALL {
        registry.register(kind.name(), move || kind.create());
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_round_trip_names() {
        for kind in EffectKind::ALL {
            assert_eq!(EffectKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.create().name(), kind.name());
        }
        assert_eq!(EffectKind::from_name("reverb"), None);
    }
}

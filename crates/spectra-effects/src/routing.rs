//! Where lanes read from and write to, and validation of the lane graph.

use crate::{LaneGraphError, LaneSettings};
use serde::{Deserialize, Serialize};

/// Input of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaneInput {
    /// Main input, channel group 0.
    #[default]
    Main,
    /// Sidechain `i`, channel group `i + 1`.
    Sidechain(usize),
    /// Final output of another lane.
    Lane(usize),
}

impl LaneInput {
    /// Input channel group read directly from the engine, if any.
    #[inline]
    pub fn group(self) -> Option<usize> {
        match self {
            Self::Main => Some(0),
            Self::Sidechain(index) => Some(index + 1),
            Self::Lane(_) => None,
        }
    }
}

/// Output of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaneOutput {
    /// Main output, channel group 0.
    #[default]
    Main,
    /// Auxiliary output `i`, channel group `i + 1`.
    Sidechain(usize),
    /// Not summed; only useful as input of other lanes.
    None,
}

impl LaneOutput {
    #[inline]
    pub fn group(self) -> Option<usize> {
        match self {
            Self::Main => Some(0),
            Self::Sidechain(index) => Some(index + 1),
            Self::None => None,
        }
    }
}

/// Check every lane's routing against the configured channel groups and
/// reject graphs in which lanes feed each other in a loop.
pub fn validate_lanes(
    lanes: &[LaneSettings],
    input_groups: usize,
    output_groups: usize,
) -> Result<(), LaneGraphError> {
    for (lane, settings) in lanes.iter().enumerate() {
        match settings.input {
            LaneInput::Lane(input) if input == lane => {
                return Err(LaneGraphError::SelfInput { lane });
            }
            LaneInput::Lane(input) if input >= lanes.len() => {
                return Err(LaneGraphError::MissingLane { lane, input });
            }
            LaneInput::Sidechain(sidechain) if sidechain + 1 >= input_groups => {
                return Err(LaneGraphError::MissingSidechain {
                    lane,
                    sidechain,
                    available: input_groups.saturating_sub(1),
                });
            }
            _ => {}
        }
        if let LaneOutput::Sidechain(sidechain) = settings.output {
            if sidechain + 1 >= output_groups {
                return Err(LaneGraphError::MissingSidechain {
                    lane,
                    sidechain,
                    available: output_groups.saturating_sub(1),
                });
            }
        }
    }

    // Each lane reads one input, so following inputs from any lane either
    // reaches an engine input or comes back around within `len` steps.
    for lane in 0..lanes.len() {
        let mut current = lane;
        let mut steps = 0;
        while let LaneInput::Lane(input) = lanes[current].input {
            current = input;
            steps += 1;
            if steps > lanes.len() {
                return Err(LaneGraphError::Cycle { lane });
            }
        }
    }
    Ok(())
}

//! Manual override commands from the operator control channel.
//!
//! The control surface sends address/value pairs. Only a closed set of
//! addresses is recognized; everything else maps to `None` and is ignored.

use serde::{Deserialize, Serialize};

/// Slider controlling the crop position, value in `[0, 1]`.
pub const ADDR_SLIDER_X: &str = "/oscControl/slider1";
/// Slider controlling the crop width, value in `[0, 1]`.
pub const ADDR_SLIDER_WIDTH: &str = "/oscControl/slider2";
/// Absolute crop position in source pixels.
pub const ADDR_X: &str = "/reframe/x";
/// Absolute crop width in source pixels.
pub const ADDR_WIDTH: &str = "/reframe/width";
/// Drop any active override.
pub const ADDR_CLEAR: &str = "/reframe/clear";

/// A recognized override instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", content = "value", rename_all = "snake_case")]
pub enum OverrideCommand {
    /// Absolute left edge in source pixels.
    X(f64),
    /// Absolute width in source pixels.
    Width(f64),
    /// Left edge as a fraction of the available travel.
    NormalizedX(f64),
    /// Width as a fraction between the target width and the source width.
    NormalizedWidth(f64),
    /// Drop any active override.
    Clear,
}

impl OverrideCommand {
    /// Map a control address and its (optional) numeric argument to a command.
    ///
    /// Returns `None` for unknown addresses or a missing/non-finite value.
    pub fn from_address(address: &str, value: Option<f64>) -> Option<Self> {
        if address == ADDR_CLEAR {
            return Some(OverrideCommand::Clear);
        }
        let value = value.filter(|v| v.is_finite())?;
        match address {
            ADDR_SLIDER_X => Some(OverrideCommand::NormalizedX(value)),
            ADDR_SLIDER_WIDTH => Some(OverrideCommand::NormalizedWidth(value)),
            ADDR_X => Some(OverrideCommand::X(value)),
            ADDR_WIDTH => Some(OverrideCommand::Width(value)),
            _ => None,
        }
    }

    /// Parameter name, as used in serialized form and metric labels.
    pub fn parameter(&self) -> &'static str {
        match self {
            OverrideCommand::X(_) => "x",
            OverrideCommand::Width(_) => "width",
            OverrideCommand::NormalizedX(_) => "normalized_x",
            OverrideCommand::NormalizedWidth(_) => "normalized_width",
            OverrideCommand::Clear => "clear",
        }
    }
}

/// Operator override of the solver output.
///
/// Each field replaces the solver's target when set. Cleared on every scene
/// cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub x: Option<f64>,
    pub width: Option<f64>,
}

impl Override {
    /// Apply a command.
    ///
    /// `source_width` and `target_width` resolve the normalized slider forms.
    pub fn apply(&mut self, command: OverrideCommand, source_width: f64, target_width: f64) {
        let travel = (source_width - target_width).max(0.0);
        match command {
            OverrideCommand::X(x) => self.x = Some(x),
            OverrideCommand::Width(w) => self.width = Some(w),
            OverrideCommand::NormalizedX(v) => self.x = Some(v.clamp(0.0, 1.0) * travel),
            OverrideCommand::NormalizedWidth(v) => {
                self.width = Some(target_width + v.clamp(0.0, 1.0) * travel)
            }
            OverrideCommand::Clear => self.clear(),
        }
    }

    /// Returns true if either field is set.
    pub fn is_active(&self) -> bool {
        self.x.is_some() || self.width.is_some()
    }

    pub fn clear(&mut self) {
        self.x = None;
        self.width = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_address() {
        assert_eq!(
            OverrideCommand::from_address("/oscControl/slider1", Some(0.5)),
            Some(OverrideCommand::NormalizedX(0.5))
        );
        assert_eq!(
            OverrideCommand::from_address("/reframe/width", Some(1200.0)),
            Some(OverrideCommand::Width(1200.0))
        );
        assert_eq!(
            OverrideCommand::from_address("/reframe/clear", None),
            Some(OverrideCommand::Clear)
        );
        assert_eq!(OverrideCommand::from_address("/oscControl/slider3", Some(1.0)), None);
        assert_eq!(OverrideCommand::from_address("/reframe/x", None), None);
        assert_eq!(OverrideCommand::from_address("/reframe/x", Some(f64::NAN)), None);
    }

    #[test]
    fn test_apply_sliders() {
        let mut ov = Override::default();
        ov.apply(OverrideCommand::NormalizedX(0.5), 1920.0, 1080.0);
        ov.apply(OverrideCommand::NormalizedWidth(1.0), 1920.0, 1080.0);
        assert_eq!(ov.x, Some(420.0));
        assert_eq!(ov.width, Some(1920.0));
        assert!(ov.is_active());

        ov.apply(OverrideCommand::Clear, 1920.0, 1080.0);
        assert!(!ov.is_active());
    }

    #[test]
    fn test_apply_absolute() {
        let mut ov = Override::default();
        ov.apply(OverrideCommand::X(500.0), 1920.0, 1080.0);
        assert_eq!(ov.x, Some(500.0));
        assert_eq!(ov.width, None);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&OverrideCommand::X(500.0)).unwrap();
        assert_eq!(json, r#"{"parameter":"x","value":500.0}"#);
    }
}

//! Action registry for the Rider Pi.
//!
//! The set of actions is closed and known ahead of time, so the registry is
//! an enum with per-variant metadata instead of a runtime table. Resolving
//! an action validates caller parameters against that metadata and produces
//! the capability id plus the final argument map the robot side expects.

use crate::error::{BridgeError, BridgeResult};
use ash_core::config::parse_bool;
use serde_json::{Map, Value};

/// Logical actions the robot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiderAction {
    // Demo movements
    GluecklichesWackeln,
    AufUndAbWackeln,
    VorUndZurueckRollen,
    AchtenFahren,
    KreisDrehen,
    HappyDance,

    // Extended control
    AdjustHeight,
    AdjustRoll,
    BalanceMode,
    PeriodicSquat,
    PeriodicShake,
    Reset,
    TestConnection,
}

/// Type and range of a caller-supplied parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Whole number; fractional input is truncated, then clamped.
    Integer { min: i64, max: i64, default: i64 },
    /// Decimal number clamped to `[min, max]`.
    Float { min: f64, max: f64, default: f64 },
    /// Strict boolean.
    Boolean { default: bool },
}

/// A parameter an action accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

const HEIGHT: ParamSpec = ParamSpec {
    name: "height",
    kind: ParamKind::Integer {
        min: 75,
        max: 115,
        default: 85,
    },
};

const ROLL: ParamSpec = ParamSpec {
    name: "roll",
    kind: ParamKind::Integer {
        min: -17,
        max: 17,
        default: 0,
    },
};

const ENABLED: ParamSpec = ParamSpec {
    name: "enabled",
    kind: ParamKind::Boolean { default: true },
};

const PERIOD: ParamSpec = ParamSpec {
    name: "period",
    kind: ParamKind::Float {
        min: 0.0,
        max: 4.0,
        default: 0.0,
    },
};

impl RiderAction {
    pub fn all() -> &'static [RiderAction] {
        &[
            RiderAction::GluecklichesWackeln,
            RiderAction::AufUndAbWackeln,
            RiderAction::VorUndZurueckRollen,
            RiderAction::AchtenFahren,
            RiderAction::KreisDrehen,
            RiderAction::HappyDance,
            RiderAction::AdjustHeight,
            RiderAction::AdjustRoll,
            RiderAction::BalanceMode,
            RiderAction::PeriodicSquat,
            RiderAction::PeriodicShake,
            RiderAction::Reset,
            RiderAction::TestConnection,
        ]
    }

    /// Names of every registered action, in registry order.
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(RiderAction::name).collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            RiderAction::GluecklichesWackeln => "glueckliches_wackeln",
            RiderAction::AufUndAbWackeln => "auf_und_ab_wackeln",
            RiderAction::VorUndZurueckRollen => "vor_und_zurueck_rollen",
            RiderAction::AchtenFahren => "achten_fahren",
            RiderAction::KreisDrehen => "kreis_drehen",
            RiderAction::HappyDance => "happy_dance",
            RiderAction::AdjustHeight => "adjust_height",
            RiderAction::AdjustRoll => "adjust_roll",
            RiderAction::BalanceMode => "balance_mode",
            RiderAction::PeriodicSquat => "periodic_squat",
            RiderAction::PeriodicShake => "periodic_shake",
            RiderAction::Reset => "reset",
            RiderAction::TestConnection => "test_connection",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|action| action.name() == name)
    }

    /// Tool identifier on the robot side.
    pub fn capability_id(&self) -> &'static str {
        match self {
            RiderAction::GluecklichesWackeln => "rider_pi_glueckliches_wackeln",
            RiderAction::AufUndAbWackeln => "rider_pi_auf_und_ab_wackeln",
            RiderAction::VorUndZurueckRollen => "rider_pi_kurz_vor_und_zurueck_rollen",
            RiderAction::AchtenFahren => "rider_pi_achten_fahren",
            RiderAction::KreisDrehen => "rider_pi_auf_und_ab_im_kreisdrehen",
            RiderAction::HappyDance => "rider_pi_happy_dance",
            RiderAction::AdjustHeight => "rider_pi_adjust_height",
            RiderAction::AdjustRoll => "rider_pi_adjust_roll",
            RiderAction::BalanceMode => "rider_pi_set_balance_mode",
            RiderAction::PeriodicSquat => "rider_pi_periodic_squat",
            RiderAction::PeriodicShake => "rider_pi_periodic_shake",
            RiderAction::Reset => "rider_pi_reset",
            RiderAction::TestConnection => "rider_pi_test_connection",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiderAction::GluecklichesWackeln => "Happy wiggle (demo action 1)",
            RiderAction::AufUndAbWackeln => "Vertical wiggle (demo action 2)",
            RiderAction::VorUndZurueckRollen => "Short roll forward and back (demo action 3)",
            RiderAction::AchtenFahren => "Drive a figure eight (demo action 4)",
            RiderAction::KreisDrehen => "Bob up and down while turning in a circle (demo action 5)",
            RiderAction::HappyDance => "Happy dance (demo action 6)",
            RiderAction::AdjustHeight => "Adjust body height (75-115mm)",
            RiderAction::AdjustRoll => "Adjust sideways tilt (-17 to 17°)",
            RiderAction::BalanceMode => "Self-balancing on/off",
            RiderAction::PeriodicSquat => "Periodic squats (0-4s, 0=stop)",
            RiderAction::PeriodicShake => "Periodic shaking (0-4s, 0=stop)",
            RiderAction::Reset => "Return to the default position",
            RiderAction::TestConnection => "Test the SSH connection to the Rider Pi",
        }
    }

    /// Parameters the caller may override.
    pub fn parameters(&self) -> &'static [ParamSpec] {
        match self {
            RiderAction::AdjustHeight => &[HEIGHT],
            RiderAction::AdjustRoll => &[ROLL],
            RiderAction::BalanceMode => &[ENABLED],
            RiderAction::PeriodicSquat | RiderAction::PeriodicShake => &[PERIOD],
            _ => &[],
        }
    }

    /// Fresh copy of the default argument map.
    pub fn default_arguments(&self) -> Map<String, Value> {
        self.parameters()
            .iter()
            .map(|spec| (spec.name.to_string(), spec.kind.default_value()))
            .collect()
    }

    /// Build the argument map for this action from raw caller parameters.
    ///
    /// Unknown parameter names and `null` values are ignored.
    pub fn arguments(&self, raw: &Map<String, Value>) -> BridgeResult<Map<String, Value>> {
        let mut arguments = self.default_arguments();
        for spec in self.parameters() {
            let Some(value) = raw.get(spec.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let normalized = spec.kind.normalize(value).map_err(|reason| {
                BridgeError::InvalidParameter {
                    action: self.name().to_string(),
                    parameter: spec.name.to_string(),
                    reason,
                }
            })?;
            arguments.insert(spec.name.to_string(), normalized);
        }
        Ok(arguments)
    }
}

impl std::fmt::Display for RiderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ParamKind {
    pub fn default_value(&self) -> Value {
        match *self {
            ParamKind::Integer { default, .. } => Value::from(default),
            ParamKind::Float { default, .. } => Value::from(default),
            ParamKind::Boolean { default } => Value::from(default),
        }
    }

    /// Coerce and clamp a raw value.
    fn normalize(&self, value: &Value) -> Result<Value, String> {
        match *self {
            ParamKind::Integer { min, max, .. } => {
                let number = as_finite_number(value)?;
                let clamped = number.trunc().clamp(min as f64, max as f64);
                Ok(Value::from(clamped as i64))
            }
            ParamKind::Float { min, max, .. } => {
                let number = as_finite_number(value)?;
                Ok(Value::from(number.clamp(min, max)))
            }
            ParamKind::Boolean { .. } => as_strict_bool(value).map(Value::from),
        }
    }
}

fn as_finite_number(value: &Value) -> Result<f64, String> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(format!("expected a number, got {value}")),
    }
}

fn as_strict_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => parse_bool(s).ok_or_else(|| format!("expected a boolean, got {value}")),
        _ => Err(format!("expected a boolean, got {value}")),
    }
}

/// An action resolved against the registry, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAction {
    pub action: RiderAction,
    pub capability_id: &'static str,
    pub arguments: Map<String, Value>,
}

/// Look up `action_name` and build its arguments from `raw_parameters`.
///
/// # Errors
///
/// `ActionNotFound` (listing every valid name) when the action is unknown,
/// `InvalidParameter` when an accepted parameter cannot be coerced.
pub fn resolve(action_name: &str, raw_parameters: &Map<String, Value>) -> BridgeResult<ResolvedAction> {
    let action = RiderAction::from_name(action_name).ok_or_else(|| BridgeError::ActionNotFound {
        action: action_name.to_string(),
        available: RiderAction::names(),
    })?;
    Ok(ResolvedAction {
        action,
        capability_id: action.capability_id(),
        arguments: action.arguments(raw_parameters)?,
    })
}

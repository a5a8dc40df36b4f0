//! Scalar fields reported by the controller and the change sets that
//! describe how a frame altered them.
//!
//! Every field starts unset (`None`), so a pool at 0 °C is distinguishable
//! from a pool whose temperature has not been shown yet.  Fields change only
//! through [`Snapshot::assign`], which records a [`FieldChange`] when (and
//! only when) the value differs.

use std::fmt;

use aqualogic_core::State;
use serde::{Deserialize, Serialize};

/// Names every observable value of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    IsMetric,
    AirTemp,
    PoolTemp,
    SpaTemp,
    PoolChlorinatorPercent,
    SpaChlorinatorPercent,
    SaltLevel,
    CheckSystemMessage,
    PumpSpeed,
    PumpPower,
    HeaterAutoMode,
    MultiSpeedPump,
    MenuLocked,
    /// The LED state bitmask (`get_states`).
    States,
    /// The decoded LCD text.
    Display,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A field value before or after a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Unset,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    States(Vec<State>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Unset, Into::into)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unset => f.write_str("-"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v:.1}"),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::States(states) => {
                let names: Vec<&str> = states.iter().map(|s| s.name()).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}

/// One field that changed while processing a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: Field,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Every field changed by a single frame, in the order they changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: Field, old: impl Into<FieldValue>, new: impl Into<FieldValue>) {
        self.changes.push(FieldChange {
            field,
            old: old.into(),
            new: new.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }

    /// Returns the change recorded for `field`, if any.
    pub fn get(&self, field: Field) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes.iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Scalar values last reported by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub is_metric: Option<bool>,
    pub air_temp: Option<i32>,
    pub pool_temp: Option<i32>,
    pub spa_temp: Option<i32>,
    pub pool_chlorinator_percent: Option<u8>,
    pub spa_chlorinator_percent: Option<u8>,
    /// g/L or PPM depending on `is_metric`, one decimal.
    pub salt_level: Option<f64>,
    pub check_system_message: Option<String>,
    pub pump_speed: Option<u32>,
    /// Watts.
    pub pump_power: Option<u32>,
    pub multi_speed_pump: Option<bool>,
    pub menu_locked: Option<bool>,
}

impl Snapshot {
    /// Stores `value` in `slot`, recording the change unless it is equal.
    pub fn assign<T>(slot: &mut Option<T>, value: T, field: Field, changes: &mut ChangeSet)
    where
        T: PartialEq + Clone + Into<FieldValue>,
    {
        if slot.as_ref() == Some(&value) {
            return;
        }
        let old = slot.replace(value.clone());
        changes.push(field, old, value);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named options a ring buffer exposes to its owner.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyId {
    BufferLength,
    NumChannels,
    Active,
}

impl PropertyId {
    pub const ALL: [PropertyId; 3] = [
        PropertyId::BufferLength,
        PropertyId::NumChannels,
        PropertyId::Active,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PropertyId::BufferLength => "BufferLength",
            PropertyId::NumChannels => "NumChannels",
            PropertyId::Active => "Active",
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropertyId {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyId::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| PropertyError::UnknownProperty(s.to_owned()))
    }
}

/// Loosely typed property value, in the spirit of a UI-facing variant type.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValue {
    Int(i64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_int(self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(v),
            PropertyValue::Bool(_) => None,
        }
    }

    /// Integers count as booleans (non-zero is true).
    pub fn as_bool(self) -> Option<bool> {
        match self {
            PropertyValue::Int(v) => Some(v != 0),
            PropertyValue::Bool(b) => Some(b),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<usize> for PropertyValue {
    fn from(v: usize) -> Self {
        PropertyValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("unknown ring buffer property `{0}`")]
    UnknownProperty(String),
    #[error("{value:?} is not a valid value for {id}")]
    InvalidValue { id: PropertyId, value: PropertyValue },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_names() {
        for id in PropertyId::ALL {
            assert_eq!(id.name().parse::<PropertyId>(), Ok(id));
        }
        assert_eq!(
            "Zoom".parse::<PropertyId>(),
            Err(PropertyError::UnknownProperty("Zoom".into()))
        );
    }

    #[test]
    fn ints_coerce_to_bool_but_not_back() {
        assert_eq!(PropertyValue::Int(0).as_bool(), Some(false));
        assert_eq!(PropertyValue::Int(3).as_bool(), Some(true));
        assert_eq!(PropertyValue::Bool(true).as_int(), None);
    }
}

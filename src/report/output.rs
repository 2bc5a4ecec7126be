//! Result records as written to the output file.
//!
//! `levels` and `achieved_mix` are keyed by name and keep signal/component
//! order, so they are serialized as maps from the ordered vectors. Signal
//! names can repeat; a repeated name keeps its first position and takes the
//! last level, so every key is written once.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{ComponentMix, MixReport, SignalLevel};

pub(crate) fn serialize_levels<S: Serializer>(
    levels: &[SignalLevel],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let merged = merge_by_name(levels);
    let mut map = serializer.serialize_map(Some(merged.len()))?;
    for level in merged {
        map.serialize_entry(&level.name, level)?;
    }
    map.end()
}

fn merge_by_name(levels: &[SignalLevel]) -> Vec<&SignalLevel> {
    let mut merged: Vec<&SignalLevel> = Vec::with_capacity(levels.len());
    for level in levels {
        match merged.iter_mut().find(|m| m.name == level.name) {
            Some(slot) => *slot = level,
            None => merged.push(level),
        }
    }
    merged
}

pub(crate) fn serialize_mix<S: Serializer>(
    mix: &[ComponentMix],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(mix.len()))?;
    for component in mix {
        map.serialize_entry(&component.name, component)?;
    }
    map.end()
}

/// Written instead of a [`MixReport`] when the spec can't be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub success: bool,
    pub error: String,
}

impl FailureReport {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

/// Either record, serialized without a wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunOutput {
    Solved(MixReport),
    Failed(FailureReport),
}

impl RunOutput {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunOutput::Failed(_))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

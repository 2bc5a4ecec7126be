//! Data model for a parsed mix specification.
//!
//! Instruments own two components each (direct sound and early reflections).
//! Signals contribute to components through sparse weight maps.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Index of a component in the target vector and the contribution matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub usize);

/// Which half of an instrument a component represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Direct,
    Early,
}

impl ComponentKind {
    /// Parse a ratio key (`direct` / `early`).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "direct" => Some(Self::Direct),
            "early" => Some(Self::Early),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Early => "early",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Build the component name for an instrument, e.g. `voc_direct`.
pub fn component_name(instrument: &str, kind: ComponentKind) -> String {
    format!("{instrument}_{}", kind.suffix())
}

/// A named sound source with an overall weight and a direct/early split.
///
/// Ratios default to 0 when the spec does not mention them.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub weight: f64,
    pub direct: f64,
    pub early: f64,
}

impl Instrument {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            direct: 0.0,
            early: 0.0,
        }
    }

    pub fn set_ratio(&mut self, kind: ComponentKind, ratio: f64) {
        match kind {
            ComponentKind::Direct => self.direct = ratio,
            ComponentKind::Early => self.early = ratio,
        }
    }

    /// Target weight for one of this instrument's components.
    pub fn target_for(&self, kind: ComponentKind) -> f64 {
        match kind {
            ComponentKind::Direct => self.weight * self.direct,
            ComponentKind::Early => self.weight * self.early,
        }
    }
}

/// Bijection between component names and contiguous indices.
///
/// Instrument `k` owns index `2k` (direct) and `2k + 1` (early).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentIndex {
    names: Vec<String>,
    lookup: HashMap<String, ComponentId>,
}

impl ComponentIndex {
    pub fn from_instruments(instruments: &[Instrument]) -> Self {
        let mut index = Self::default();
        for instrument in instruments {
            for kind in [ComponentKind::Direct, ComponentKind::Early] {
                let name = component_name(&instrument.name, kind);
                let id = ComponentId(index.names.len());
                index.lookup.insert(name.clone(), id);
                index.names.push(name);
            }
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<ComponentId> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, id: ComponentId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Desired weight per component. Unlisted components have weight 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    weights: BTreeMap<ComponentId, f64>,
}

impl Target {
    pub fn from_instruments(instruments: &[Instrument], index: &ComponentIndex) -> Self {
        let mut weights = BTreeMap::new();
        for instrument in instruments {
            for kind in [ComponentKind::Direct, ComponentKind::Early] {
                if let Some(id) = index.get(&component_name(&instrument.name, kind)) {
                    weights.insert(id, instrument.target_for(kind));
                }
            }
        }
        Self { weights }
    }

    pub fn get(&self, id: ComponentId) -> f64 {
        self.weights.get(&id).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, f64)> + '_ {
        self.weights.iter().map(|(&id, &w)| (id, w))
    }
}

/// A gain-controllable route and what it feeds into each component.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub weights: BTreeMap<ComponentId, f64>,
    pub is_hall: bool,
}

impl Signal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weights: BTreeMap::new(),
            is_hall: false,
        }
    }

    pub fn hall(name: impl Into<String>, early: ComponentId, gain: f64) -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(early, gain);
        Self {
            name: name.into(),
            weights,
            is_hall: true,
        }
    }

    pub fn weight(&self, id: ComponentId) -> f64 {
        self.weights.get(&id).copied().unwrap_or(0.0)
    }
}

/// Something the parser dropped or reinterpreted. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseWarning {
    UnrecognizedLine { line: usize, text: String },
    UnknownComponent { line: usize, signal: String, component: String },
    DuplicateInstrument { line: usize, name: String },
    RepeatedTarget { line: usize, first_line: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedLine { line, text } => {
                write!(f, "line {line}: skipped unrecognized line '{text}'")
            }
            Self::UnknownComponent {
                line,
                signal,
                component,
            } => write!(
                f,
                "line {line}: signal '{signal}' references unknown component '{component}'"
            ),
            Self::DuplicateInstrument { line, name } => {
                write!(f, "line {line}: instrument '{name}' declared again, later values win")
            }
            Self::RepeatedTarget { line, first_line } => write!(
                f,
                "line {line}: another target section, merged into the one at line {first_line}"
            ),
        }
    }
}

/// A complete mix specification.
///
/// Built once by the parser; only the hall augmenter appends to `signals`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    pub instruments: Vec<Instrument>,
    pub components: ComponentIndex,
    pub target: Target,
    pub signals: Vec<Signal>,
    pub hall_gain_db: f64,
    pub warnings: Vec<ParseWarning>,
}

impl Spec {
    pub fn instrument_names(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.name.clone()).collect()
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }
}

//! Parser for the mix spec format.
//!
//! Works in two passes over the classified lines. The first pass collects
//! the `target:` block(s) and the hall gain, which fixes the component
//! index. The second pass reads signal declarations against that index, so
//! a signal may appear before or after the target block in the file.
//!
//! Blocks are delimited by indentation: the first content line after a
//! header sets the base indent and the block ends at the first line indented
//! less than that. Lines that fit nothing are skipped.

use tracing::{debug, warn};

use super::error::ParseError;
use super::lexer::{InlineEntry, Line, LineKind};
use super::model::*;

/// Which kind of block the state machine is inside.
#[derive(Debug, Clone, PartialEq)]
enum Block {
    Target,
    /// Index into the signal list being built.
    Signal(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    AwaitingHeader,
    InBlockBody {
        block: Block,
        base: Option<usize>,
    },
    InNestedRatio {
        block: Block,
        base: usize,
        instrument: String,
        weight: f64,
    },
}

impl State {
    fn open(block: Block) -> Self {
        State::InBlockBody { block, base: None }
    }

    /// Close the block if `line` is dedented past its base, and fix the base
    /// indent on the first body line.
    fn enter_line(&mut self, line: &Line) {
        let closes = match self {
            State::AwaitingHeader => false,
            State::InBlockBody {
                base: base @ None, ..
            } => {
                *base = Some(line.indent);
                false
            }
            State::InBlockBody { base: Some(b), .. } => line.indent < *b,
            State::InNestedRatio { base, .. } => line.indent < *base,
        };
        if closes {
            *self = State::AwaitingHeader;
        }
    }
}

/// Output of the first pass.
#[derive(Debug, Default)]
struct TargetPass {
    instruments: Vec<Instrument>,
    hall_gain_db: f64,
    first_header: Option<usize>,
}

pub struct Parser {
    lines: Vec<Line>,
    used: Vec<bool>,
    warnings: Vec<ParseWarning>,
}

impl Parser {
    pub fn new(lines: Vec<Line>) -> Self {
        let used = vec![false; lines.len()];
        Self {
            lines,
            used,
            warnings: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<Spec, ParseError> {
        let targets = self.parse_targets();

        let header_line = targets.first_header.ok_or(ParseError::MissingTarget)?;
        if targets.instruments.is_empty() {
            return Err(ParseError::EmptyTarget { line: header_line });
        }

        let components = ComponentIndex::from_instruments(&targets.instruments);
        let target = Target::from_instruments(&targets.instruments, &components);
        let signals = self.parse_signals(&components);

        for (i, line) in self.lines.iter().enumerate() {
            if self.used[i] {
                continue;
            }
            let text = line.text.clone();
            debug!(line = line.number, %text, "skipping unrecognized line");
            self.warnings.push(ParseWarning::UnrecognizedLine {
                line: line.number,
                text,
            });
        }

        debug!(
            instruments = targets.instruments.len(),
            signals = signals.len(),
            hall_gain_db = targets.hall_gain_db,
            "parsed mix spec"
        );

        Ok(Spec {
            instruments: targets.instruments,
            components,
            target,
            signals,
            hall_gain_db: targets.hall_gain_db,
            warnings: self.warnings,
        })
    }

    /// Pass one: target blocks and `hall gain:` lines.
    fn parse_targets(&mut self) -> TargetPass {
        let mut pass = TargetPass::default();
        let mut state = State::AwaitingHeader;

        for i in 0..self.lines.len() {
            let line = self.lines[i].clone();
            state.enter_line(&line);

            if let LineKind::HallGain(db) = line.kind {
                pass.hall_gain_db = db;
                self.used[i] = true;
                continue;
            }

            match &state {
                State::AwaitingHeader => {
                    if line.kind == LineKind::TargetHeader {
                        match pass.first_header {
                            Some(first) => self.repeated_target(first, line.number),
                            None => pass.first_header = Some(line.number),
                        }
                        state = State::open(Block::Target);
                        self.used[i] = true;
                    }
                }
                State::InBlockBody {
                    block: Block::Target,
                    base: Some(base),
                }
                | State::InNestedRatio {
                    block: Block::Target,
                    base,
                    ..
                } => {
                    let base = *base;
                    let LineKind::Entry { key, value } = &line.kind else {
                        continue;
                    };

                    if line.indent == base {
                        self.declare_instrument(&mut pass.instruments, key, *value, line.number);
                        state = State::InNestedRatio {
                            block: Block::Target,
                            base,
                            instrument: key.clone(),
                            weight: *value,
                        };
                        self.used[i] = true;
                    } else if let (Some(kind), State::InNestedRatio { instrument, .. }) =
                        (ComponentKind::from_key(key), &state)
                    {
                        if line.indent > base {
                            if let Some(inst) =
                                pass.instruments.iter_mut().find(|x| &x.name == instrument)
                            {
                                inst.set_ratio(kind, *value);
                                self.used[i] = true;
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        pass
    }

    fn repeated_target(&mut self, first_line: usize, line: usize) {
        warn!(line, first_line, "another target section, merging it into the first");
        self.warnings
            .push(ParseWarning::RepeatedTarget { line, first_line });
    }

    fn declare_instrument(
        &mut self,
        instruments: &mut Vec<Instrument>,
        name: &str,
        weight: f64,
        line: usize,
    ) {
        let fresh = Instrument::new(name, weight);
        match instruments.iter_mut().find(|x| x.name == name) {
            Some(existing) => {
                warn!(line, instrument = name, "instrument declared twice, later values win");
                self.warnings.push(ParseWarning::DuplicateInstrument {
                    line,
                    name: name.to_string(),
                });
                *existing = fresh;
            }
            None => {
                debug!(line, instrument = name, weight, "declared instrument");
                instruments.push(fresh);
            }
        }
    }

    /// Pass two: nested and inline signal declarations.
    fn parse_signals(&mut self, components: &ComponentIndex) -> Vec<Signal> {
        let mut signals: Vec<Signal> = Vec::new();
        let mut state = State::AwaitingHeader;

        for i in 0..self.lines.len() {
            let line = self.lines[i].clone();
            state.enter_line(&line);

            match &state {
                State::AwaitingHeader => match &line.kind {
                    LineKind::SignalHeader(name) => {
                        signals.push(Signal::new(name.as_str()));
                        state = State::open(Block::Signal(signals.len() - 1));
                        self.used[i] = true;
                    }
                    LineKind::InlineSignal { name, entries } => {
                        let signal = self.inline_signal(name, entries, components, line.number);
                        debug!(signal = %signal.name, components = signal.weights.len(), "declared inline signal");
                        signals.push(signal);
                        self.used[i] = true;
                    }
                    _ => {}
                },
                State::InBlockBody {
                    block: Block::Signal(idx),
                    base: Some(base),
                }
                | State::InNestedRatio {
                    block: Block::Signal(idx),
                    base,
                    ..
                } => {
                    let (idx, base) = (*idx, *base);
                    let LineKind::Entry { key, value } = &line.kind else {
                        continue;
                    };

                    if line.indent == base {
                        state = State::InNestedRatio {
                            block: Block::Signal(idx),
                            base,
                            instrument: key.clone(),
                            weight: *value,
                        };
                        self.used[i] = true;
                    } else if let (
                        Some(kind),
                        State::InNestedRatio {
                            instrument, weight, ..
                        },
                    ) = (ComponentKind::from_key(key), &state)
                    {
                        if line.indent > base {
                            let name = component_name(instrument, kind);
                            let signal = &mut signals[idx];
                            match components.get(&name) {
                                Some(id) => {
                                    signal.weights.insert(id, weight * value);
                                }
                                None => self.unknown_component(&signal.name, &name, line.number),
                            }
                            self.used[i] = true;
                        }
                    }
                }
                _ => {}
            }
        }

        signals
    }

    fn inline_signal(
        &mut self,
        name: &str,
        entries: &[InlineEntry],
        components: &ComponentIndex,
        line: usize,
    ) -> Signal {
        let mut signal = Signal::new(name);
        for entry in entries {
            let component = if entry.component == "direct" {
                component_name(name, ComponentKind::Direct)
            } else {
                entry.component.clone()
            };
            match components.get(&component) {
                Some(id) => {
                    signal.weights.insert(id, entry.weight);
                }
                None => self.unknown_component(name, &component, line),
            }
        }
        signal
    }

    fn unknown_component(&mut self, signal: &str, component: &str, line: usize) {
        warn!(line, signal, component, "dropping reference to unknown component");
        self.warnings.push(ParseWarning::UnknownComponent {
            line,
            signal: signal.to_string(),
            component: component.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::lexer::Lexer;

    fn parse(src: &str) -> Result<Spec, ParseError> {
        let lines = Lexer::new(src).tokenize();
        Parser::new(lines).parse()
    }

    const BAND: &str = r#"
# band mix
target:
  voc: 0.6
    direct: 0.9
    early: 0.1
  gtr: 0.4
    direct: 0.5
    early: 0.5

hall gain: -6

signal voc: 1.0 direct, 0.1 voc_early
signal room:
  voc: 0.2
    early: 1.0
  gtr: 0.5
    direct: 0.2
    early: 0.8
"#;

    #[test]
    fn parse_target_block() {
        let spec = parse(BAND).unwrap();
        assert_eq!(spec.instrument_names(), vec!["voc", "gtr"]);
        assert_eq!(
            spec.components.names(),
            &["voc_direct", "voc_early", "gtr_direct", "gtr_early"]
        );
        assert!((spec.target.get(ComponentId(0)) - 0.54).abs() < 1e-12);
        assert!((spec.target.get(ComponentId(1)) - 0.06).abs() < 1e-12);
        assert!((spec.target.get(ComponentId(2)) - 0.2).abs() < 1e-12);
        assert!((spec.target.get(ComponentId(3)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn parse_hall_gain() {
        let spec = parse(BAND).unwrap();
        assert_eq!(spec.hall_gain_db, -6.0);
    }

    #[test]
    fn parse_inline_signal_with_direct_alias() {
        let spec = parse(BAND).unwrap();
        let voc = spec.signal("voc").unwrap();
        assert!(!voc.is_hall);
        assert_eq!(voc.weight(ComponentId(0)), 1.0);
        assert_eq!(voc.weight(ComponentId(1)), 0.1);
        assert_eq!(voc.weights.len(), 2);
    }

    #[test]
    fn parse_nested_signal_multiplies_weights() {
        let spec = parse(BAND).unwrap();
        let room = spec.signal("room").unwrap();
        assert!((room.weight(ComponentId(1)) - 0.2).abs() < 1e-12);
        assert!((room.weight(ComponentId(2)) - 0.1).abs() < 1e-12);
        assert!((room.weight(ComponentId(3)) - 0.4).abs() < 1e-12);
        assert!(!room.weights.contains_key(&ComponentId(0)));
    }

    #[test]
    fn signals_keep_declaration_order() {
        let spec = parse(BAND).unwrap();
        let names: Vec<_> = spec.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["voc", "room"]);
    }

    #[test]
    fn signal_before_target_block_is_resolved() {
        let src = "signal voc: 1.0 voc_direct\ntarget:\n  voc: 1.0\n    direct: 1.0\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.signals.len(), 1);
        assert_eq!(spec.signals[0].weight(ComponentId(0)), 1.0);
    }

    #[test]
    fn missing_target_is_fatal() {
        let err = parse("signal voc: 1.0 voc_direct\nhall gain: -3\n").unwrap_err();
        assert_eq!(err, ParseError::MissingTarget);
    }

    #[test]
    fn empty_target_is_fatal() {
        let err = parse("target:\n\nsignal voc: 1.0 voc_direct\n").unwrap_err();
        assert_eq!(err, ParseError::EmptyTarget { line: 1 });
    }

    #[test]
    fn instrument_without_ratios_targets_zero() {
        let spec = parse("target:\n  bass: 0.8\n").unwrap();
        assert_eq!(spec.target.get(ComponentId(0)), 0.0);
        assert_eq!(spec.target.get(ComponentId(1)), 0.0);
    }

    #[test]
    fn unknown_component_is_dropped_with_warning() {
        let src = "target:\n  voc: 1.0\n    direct: 1.0\nsignal voc: 1.0 vox_direct, 0.5 voc_early\n";
        let spec = parse(src).unwrap();
        let voc = spec.signal("voc").unwrap();
        assert_eq!(voc.weights.len(), 1);
        assert_eq!(voc.weight(ComponentId(1)), 0.5);
        assert!(spec.warnings.iter().any(|w| matches!(
            w,
            ParseWarning::UnknownComponent { component, .. } if component == "vox_direct"
        )));
    }

    #[test]
    fn nested_signal_for_unknown_instrument_is_dropped() {
        let src = "target:\n  voc: 1.0\n    direct: 1.0\nsignal drums:\n  kick: 1.0\n    direct: 1.0\n";
        let spec = parse(src).unwrap();
        let drums = spec.signal("drums").unwrap();
        assert!(drums.weights.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let src = "target:\n  voc: 1.0\n    direct: lots\n    early: 0.3\n  ??? garbage\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.instruments.len(), 1);
        assert_eq!(spec.instruments[0].direct, 0.0);
        assert!((spec.instruments[0].early - 0.3).abs() < 1e-12);
        assert_eq!(
            spec.warnings
                .iter()
                .filter(|w| matches!(w, ParseWarning::UnrecognizedLine { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn dedent_closes_target_block() {
        let src = "  target:\n    voc: 1.0\n      direct: 1.0\n  gtr: 1.0\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.instrument_names(), vec!["voc"]);
    }

    #[test]
    fn ratio_at_base_indent_declares_instrument() {
        // `direct:` at base indent is read as an instrument called "direct"
        let src = "target:\n  voc: 1.0\n  direct: 0.5\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.instrument_names(), vec!["voc", "direct"]);
        assert_eq!(spec.instruments[0].direct, 0.0);
    }

    #[test]
    fn later_hall_gain_wins() {
        let src = "hall gain: -3\ntarget:\n  voc: 1.0\nhall gain: -12.5\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.hall_gain_db, -12.5);
    }

    #[test]
    fn hall_gain_inside_target_block() {
        let src = "target:\n  voc: 1.0\n    direct: 1.0\n  hall gain: 4\n  gtr: 1.0\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.hall_gain_db, 4.0);
        assert_eq!(spec.instrument_names(), vec!["voc", "gtr"]);
    }

    #[test]
    fn duplicate_instrument_keeps_position_and_later_values() {
        let src = "target:\n  voc: 0.5\n    direct: 1.0\n  gtr: 0.5\n  voc: 0.8\n    early: 1.0\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.instrument_names(), vec!["voc", "gtr"]);
        assert_eq!(spec.components.len(), 4);
        assert_eq!(spec.target.get(ComponentId(0)), 0.0);
        assert!((spec.target.get(ComponentId(1)) - 0.8).abs() < 1e-12);
        assert!(spec
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::DuplicateInstrument { name, .. } if name == "voc")));
    }

    #[test]
    fn second_target_block_merges_with_warning() {
        let src = "target:\n  voc: 0.5\n    direct: 1.0\nsignal voc: 1.0 direct\ntarget:\n  gtr: 0.5\n    early: 1.0\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.instrument_names(), vec!["voc", "gtr"]);
        assert!((spec.target.get(ComponentId(0)) - 0.5).abs() < 1e-12);
        assert!((spec.target.get(ComponentId(3)) - 0.5).abs() < 1e-12);
        assert!(spec.warnings.contains(&ParseWarning::RepeatedTarget {
            line: 5,
            first_line: 1
        }));
    }

    #[test]
    fn single_target_block_has_no_repeat_warning() {
        let spec = parse(BAND).unwrap();
        assert!(!spec
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::RepeatedTarget { .. })));
    }

    #[test]
    fn unindented_target_body_runs_to_end_of_file() {
        let src = "target:\nvoc: 1.0\n  direct: 1.0\nsignal voc: 1.0 direct\n";
        let spec = parse(src).unwrap();
        assert_eq!(spec.instrument_names(), vec!["voc"]);
        assert_eq!(spec.signals.len(), 1);
        assert_eq!(spec.signals[0].weight(ComponentId(0)), 1.0);
    }

    #[test]
    fn later_ratio_in_nested_signal_overwrites() {
        let src = "target:\n  voc: 1.0\nsignal a:\n  voc: 0.5\n    direct: 1.0\n    direct: 0.4\n";
        let spec = parse(src).unwrap();
        assert!((spec.signal("a").unwrap().weight(ComponentId(0)) - 0.2).abs() < 1e-12);
    }
}

//! Line classifier for the mix spec format.
//!
//! The format is line oriented, so instead of a character token stream the
//! lexer produces one [`Line`] per meaningful source line, tagged with its
//! indentation. Blank lines and `#` comments never reach the parser.

/// A classified source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// 1-based line number in the source text.
    pub number: usize,
    /// Count of leading whitespace characters.
    pub indent: usize,
    /// The line with surrounding whitespace removed.
    pub text: String,
    pub kind: LineKind,
}

/// The shape of a line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// `target:`
    TargetHeader,
    /// `signal <name>:` with nothing after the colon.
    SignalHeader(String),
    /// `signal <name>: <float> <component>, ...`
    InlineSignal {
        name: String,
        entries: Vec<InlineEntry>,
    },
    /// `hall gain: <signed float>`
    HallGain(f64),
    /// `<word>: <unsigned float>`, either an instrument or a ratio line.
    Entry { key: String, value: f64 },
    /// Anything else. Kept so the parser can report it.
    Other,
}

/// One `<float> <component>` item of an inline signal list.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineEntry {
    pub weight: f64,
    pub component: String,
}

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn tokenize(&self) -> Vec<Line> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let stripped = raw.trim();
                if stripped.is_empty() || stripped.starts_with('#') {
                    return None;
                }
                let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
                Some(Line {
                    number: i + 1,
                    indent,
                    text: stripped.to_string(),
                    kind: classify(stripped),
                })
            })
            .collect()
    }
}

fn classify(stripped: &str) -> LineKind {
    if stripped == "target:" {
        return LineKind::TargetHeader;
    }
    if let Some(kind) = lex_signal(stripped) {
        return kind;
    }
    if let Some(db) = lex_hall_gain(stripped) {
        return LineKind::HallGain(db);
    }
    if let Some((key, value)) = lex_entry(stripped) {
        return LineKind::Entry { key, value };
    }
    LineKind::Other
}

fn lex_signal(stripped: &str) -> Option<LineKind> {
    let rest = stripped.strip_prefix("signal")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let (name_token, list) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };
    let name = name_token.strip_suffix(':')?;
    if name.is_empty() {
        return None;
    }

    if list.is_empty() {
        Some(LineKind::SignalHeader(name.to_string()))
    } else {
        Some(LineKind::InlineSignal {
            name: name.to_string(),
            entries: lex_inline_entries(list),
        })
    }
}

/// Split `0.5 voc_direct, 0.2 gtr_early` into entries.
/// Parts that don't start with `<float> <name>` are dropped.
fn lex_inline_entries(list: &str) -> Vec<InlineEntry> {
    list.split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let weight = parse_unsigned(words.next()?)?;
            let component = words.next()?.to_string();
            Some(InlineEntry { weight, component })
        })
        .collect()
}

fn lex_hall_gain(stripped: &str) -> Option<f64> {
    let rest = stripped.strip_prefix("hall")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let value = rest.trim_start().strip_prefix("gain:")?.trim();
    match value.strip_prefix('-') {
        Some(magnitude) => parse_unsigned(magnitude).map(|v| -v),
        None => parse_unsigned(value),
    }
}

fn lex_entry(stripped: &str) -> Option<(String, f64)> {
    let (key, value) = stripped.split_once(':')?;
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let value = parse_unsigned(value.trim())?;
    Some((key.to_string(), value))
}

/// Digits and dots only, and it has to be a finite float.
fn parse_unsigned(s: &str) -> Option<f64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

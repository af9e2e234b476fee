//! The rel selector grammar.
//!
//! Three forms, tried in a fixed order:
//!
//! 1. `name[index]` picks an element of an array by zero-based position.
//! 2. `name[key:value]` picks the first array element whose `key` equals `value`.
//! 3. `name` looks up a single link.
//!
//! The first grammar whose pattern matches decides the form. A rel that
//! contains brackets but fits neither array grammar is malformed.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static ARRAY_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)\[(\d+)\]$").expect("valid array index pattern"));

static ARRAY_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]]+)\[([^:\[\]]+):([^\[\]]*)\]$").expect("valid array property pattern")
});

/// A parsed rel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelSelector {
    ArrayIndex { name: String, index: usize },
    ArrayProperty { name: String, key: String, value: String },
    Plain(String),
}

type Grammar = fn(&str) -> Option<RelSelector>;

/// Precedence order of the grammars.
const GRAMMARS: [Grammar; 3] = [array_index, array_property, plain];

impl RelSelector {
    /// Parses `rel`, returning `None` when it is malformed.
    pub fn parse(rel: &str) -> Option<Self> {
        GRAMMARS.iter().find_map(|grammar| grammar(rel))
    }

    /// The array or link name the selector refers to.
    pub fn name(&self) -> &str {
        match self {
            RelSelector::ArrayIndex { name, .. }
            | RelSelector::ArrayProperty { name, .. }
            | RelSelector::Plain(name) => name,
        }
    }
}

impl fmt::Display for RelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelSelector::ArrayIndex { name, index } => write!(f, "{name}[{index}]"),
            RelSelector::ArrayProperty { name, key, value } => write!(f, "{name}[{key}:{value}]"),
            RelSelector::Plain(name) => f.write_str(name),
        }
    }
}

fn array_index(rel: &str) -> Option<RelSelector> {
    let captures = ARRAY_INDEX.captures(rel)?;
    // Indices too large for usize are treated as malformed.
    let index = captures[2].parse().ok()?;
    Some(RelSelector::ArrayIndex {
        name: captures[1].to_string(),
        index,
    })
}

fn array_property(rel: &str) -> Option<RelSelector> {
    let captures = ARRAY_PROPERTY.captures(rel)?;
    Some(RelSelector::ArrayProperty {
        name: captures[1].to_string(),
        key: captures[2].to_string(),
        value: captures[3].to_string(),
    })
}

fn plain(rel: &str) -> Option<RelSelector> {
    if rel.is_empty() || rel.contains(['[', ']']) {
        return None;
    }
    Some(RelSelector::Plain(rel.to_string()))
}

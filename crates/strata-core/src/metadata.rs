//! Array-level metadata: attributes and cell-method provenance

use std::collections::BTreeMap;
use std::fmt;

/// Attribute value
///
/// Floats compare bit-for-bit so that `NaN` attributes agree with themselves
/// and `0.0` differs from `-0.0`.
#[derive(Clone, Debug)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    FloatList(Vec<f64>),
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Int(a), AttrValue::Int(b)) => a == b,
            (AttrValue::Float(a), AttrValue::Float(b)) => a.to_bits() == b.to_bits(),
            (AttrValue::Text(a), AttrValue::Text(b)) => a == b,
            (AttrValue::FloatList(a), AttrValue::FloatList(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

impl Eq for AttrValue {}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::FloatList(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Text(v) => f.write_str(v),
            AttrValue::FloatList(v) => write!(f, "{:?}", v),
        }
    }
}

/// Attribute mapping, ordered by key
pub type Attributes = BTreeMap<String, AttrValue>;

/// Record of a reduction already applied along one or more coordinates
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellMethod {
    pub method: String,
    pub coords: Vec<String>,
    pub intervals: Vec<String>,
    pub comments: Vec<String>,
}

impl CellMethod {
    pub fn new(method: impl Into<String>, coords: &[&str]) -> Self {
        CellMethod {
            method: method.into(),
            coords: coords.iter().map(|c| c.to_string()).collect(),
            intervals: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.intervals.push(interval.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }
}

impl fmt::Display for CellMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.coords.join(": "), self.method)?;
        for interval in &self.intervals {
            write!(f, " (interval: {})", interval)?;
        }
        for comment in &self.comments {
            write!(f, " (comment: {})", comment)?;
        }
        Ok(())
    }
}

/// Naming, units, attributes and provenance of an array
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ArrayMetadata {
    pub name: Option<String>,
    pub var_name: Option<String>,
    pub units: String,
    pub attributes: Attributes,
    pub cell_methods: Vec<CellMethod>,
}

impl ArrayMetadata {
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        ArrayMetadata {
            name: Some(name.into()),
            units: units.into(),
            ..ArrayMetadata::default()
        }
    }

    /// Display name: the name, then the variable name, then `"unknown"`
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.var_name.as_deref())
            .unwrap_or("unknown")
    }
}

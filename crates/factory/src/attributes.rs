//! Attribute sets and attribute value definitions

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};

/// Ordered attribute name -> value mapping for a record under construction
pub type AttributeSet = Map<String, Value>;

/// A materialized record, always a JSON object
pub type Record = Value;

/// How a declared attribute produces its value
#[derive(Clone)]
pub enum AttributeDef {
    /// Fixed value cloned into every record
    Static(Value),
    /// Evaluated once per record
    Callable(Arc<dyn Fn() -> Value + Send + Sync>),
    /// Evaluated with the factory's sequence number
    Sequence(Arc<dyn Fn(u64) -> Value + Send + Sync>),
}

impl AttributeDef {
    /// Produce the value for the record numbered `sequence`
    pub fn evaluate(&self, sequence: u64) -> Value {
        match self {
            AttributeDef::Static(value) => value.clone(),
            AttributeDef::Callable(f) => f(),
            AttributeDef::Sequence(f) => f(sequence),
        }
    }
}

impl fmt::Debug for AttributeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDef::Static(value) => f.debug_tuple("Static").field(value).finish(),
            AttributeDef::Callable(_) => f.write_str("Callable(..)"),
            AttributeDef::Sequence(_) => f.write_str("Sequence(..)"),
        }
    }
}

impl From<Value> for AttributeDef {
    fn from(value: Value) -> Self {
        AttributeDef::Static(value)
    }
}

/// Ordered list of named attribute definitions
#[derive(Debug, Clone, Default)]
pub struct AttributeDefs {
    defs: Vec<(String, AttributeDef)>,
}

impl AttributeDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition, keeping the original position on replace
    pub fn set(&mut self, name: impl Into<String>, def: AttributeDef) {
        let name = name.into();
        match self.defs.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = def,
            None => self.defs.push((name, def)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.iter().any(|(existing, _)| existing == name)
    }

    /// Evaluate every definition into `attrs`, overwriting existing keys
    pub fn evaluate_into(&self, attrs: &mut AttributeSet, sequence: u64) {
        for (name, def) in &self.defs {
            attrs.insert(name.clone(), def.evaluate(sequence));
        }
    }
}

/// Per-factory sequence counter
///
/// Each evaluated record takes its own number from [`Sequence::advance`] and
/// passes it to every definition, so concurrent creates never share one.
#[derive(Debug)]
pub struct Sequence {
    next: AtomicU64,
}

impl Sequence {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Take the next number; called once per evaluated record
    pub fn advance(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// Merge `fragment` into `attrs`, later keys winning
pub fn merge(attrs: &mut AttributeSet, fragment: AttributeSet) {
    for (key, value) in fragment {
        attrs.insert(key, value);
    }
}

/// Whether `key` holds a usable value; JSON `null` counts as absent
pub fn is_present(attrs: &AttributeSet, key: &str) -> bool {
    attrs.get(key).map_or(false, |value| !value.is_null())
}

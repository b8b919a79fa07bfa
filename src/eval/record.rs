use std::collections::{BTreeMap, HashMap};

use crate::ast::value::Value;

/// Read access to one metadata record, implemented by the host.
///
/// The evaluator calls [`get`](Record::get) once per `%field%` reference it
/// reaches. It never mutates a record and never keeps one past the
/// evaluation call it was passed to, so a record may be shared by any
/// number of concurrent evaluations.
pub trait Record {
    /// Look up a field by name. Return `None` if the record has no value
    /// for it; the reference then renders as empty text.
    fn get(&self, field: &str) -> Option<Value>;
}

impl<R: Record + ?Sized> Record for &R {
    fn get(&self, field: &str) -> Option<Value> {
        (**self).get(field)
    }
}

impl Record for HashMap<String, Value> {
    fn get(&self, field: &str) -> Option<Value> {
        HashMap::get(self, field).cloned()
    }
}

impl Record for BTreeMap<String, Value> {
    fn get(&self, field: &str) -> Option<Value> {
        BTreeMap::get(self, field).cloned()
    }
}

/// A minimal map-backed [`Record`] for tests and simple hosts.
///
/// ```rust
/// use trackfmt::{Record, SimpleRecord, Value};
///
/// let record = SimpleRecord::new()
///     .with("title", "So What")
///     .with("track", 1i64);
/// assert_eq!(record.get("track"), Some(Value::Integer(1)));
/// assert_eq!(record.get("album"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleRecord {
    fields: HashMap<String, Value>,
}

impl SimpleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Accepts anything that converts into a [`Value`]
    /// (strings, integers, floats).
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Builder-style [`set`](SimpleRecord::set).
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Record for SimpleRecord {
    fn get(&self, field: &str) -> Option<Value> {
        self.fields.get(field).cloned()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for SimpleRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

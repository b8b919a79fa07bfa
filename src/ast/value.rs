use std::fmt;

/// A typed field value stored in a [`Record`](crate::Record).
///
/// Absence is not a variant: a record that has no value for a field
/// returns `None` from [`Record::get`](crate::Record::get). Values only
/// meet the template language as text, via [`render`](Value::render).
///
/// ```rust
/// use trackfmt::Value;
///
/// let title: Value = "Blue in Green".into();
/// let track: Value = 3i64.into();
/// let gain: Value = (-6.5f64).into();
/// assert_eq!(track.render().as_deref(), Some("3"));
/// assert_eq!(gain.render().as_deref(), Some("-6.5"));
/// # let _ = title;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    /// Render this value as template text.
    ///
    /// - `String` — returned as-is
    /// - `Integer` — canonical decimal
    /// - `Float` — shortest decimal that round-trips, without a trailing `.0`
    ///
    /// Returns `None` for NaN and infinities, which have no decimal form.
    pub fn render(&self) -> Option<String> {
        self.clone().into_text()
    }

    /// Owned form of [`render`](Value::render) that reuses a string
    /// value's buffer.
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(n) if n.is_finite() => Some(format!("{n}")),
            Value::Float(_) => None,
        }
    }

    /// Type name for diagnostic messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            Value::String(_) => None,
        }
    }
}

/// Writes the same text as [`render`](Value::render), and nothing for a
/// non-finite float.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) if n.is_finite() => write!(f, "{n}"),
            Value::Float(_) => Ok(()),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

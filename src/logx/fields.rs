//! Ordered key/value fields attached to log records.

use serde::Serialize;
use serde_json::Value;

/// An ordered sequence of `(key, value)` pairs.
///
/// Keys are text, values are anything `serde` can serialize. Insertion order
/// is preserved in the rendered record. Duplicate keys are kept here; the
/// logger writes a repeated key as `fields.<key>`.
///
/// Build fields with the [`kv!`](crate::kv) macro or [`Fields::with`]; both
/// make an unpaired value impossible to express.
///
/// # Examples
///
/// ```
/// use faultline::kv;
///
/// let fields = kv! {
///     "user_id" => 12345,
///     "operation" => "fetch_user_data",
/// };
/// assert_eq!(fields.len(), 2);
/// assert_eq!(fields.get("user_id"), Some(&serde_json::json!(12345)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pairs: Vec<(String, Value)>,
}

/// Error returned when flat key/value input cannot be paired up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldsError {
    /// The input had an odd number of entries; the last value has no key.
    #[error("odd number of key/value entries ({0}); the last entry has no value")]
    OddLength(usize),
}

impl Fields {
    /// Create an empty set of fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair and return `self`.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        self.pairs.push((key.into(), to_value(value)));
    }

    /// Append all pairs of `other`.
    pub fn extend(&mut self, other: Fields) {
        self.pairs.extend(other.pairs);
    }

    /// Pair up a flat, alternating `key, value, key, value, ...` list.
    ///
    /// Keys that are not JSON strings are converted to their JSON text.
    /// Odd-length input is rejected instead of silently dropping the last
    /// entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::logx::{Fields, FieldsError};
    /// use serde_json::json;
    ///
    /// let fields = Fields::from_flat(vec![json!("request_id"), json!("req_1"), json!(7), json!(true)]).unwrap();
    /// assert_eq!(fields.get("7"), Some(&json!(true)));
    ///
    /// let err = Fields::from_flat(vec![json!("status"), json!(500), json!("dangling")]).unwrap_err();
    /// assert_eq!(err, FieldsError::OddLength(3));
    /// ```
    pub fn from_flat<I>(values: I) -> Result<Self, FieldsError>
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        if values.len() % 2 != 0 {
            return Err(FieldsError::OddLength(values.len()));
        }

        let mut fields = Fields::new();
        let mut iter = values.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            let key = match key {
                Value::String(text) => text,
                other => other.to_string(),
            };
            fields.pairs.push((key, value));
        }
        Ok(fields)
    }

    /// The first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Iterate pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Serialize,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

fn to_value(value: impl Serialize) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|err| Value::String(format!("!unserializable: {}", err)))
}

/// Build [`Fields`] from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use faultline::kv;
///
/// let empty = kv! {};
/// assert!(empty.is_empty());
///
/// let fields = kv! { "attempt" => 2, "retry" => false };
/// let keys: Vec<&str> = fields.iter().map(|(key, _)| key).collect();
/// assert_eq!(keys, vec!["attempt", "retry"]);
/// ```
#[macro_export]
macro_rules! kv {
    () => {
        $crate::logx::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::logx::Fields::new()$(.with($key, $value))+
    };
}

use std::collections::HashMap;
use std::fmt;

/// Mapping-like box around a key/value operation result.
///
/// Populated once on the engine side, then only read. Lookups never fail: a
/// missing field is an ordinary outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBox<V> {
    fields: HashMap<String, V>,
}

impl<V> Default for ResultBox<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResultBox<V> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn from_fields<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, value: V) -> Option<V> {
        self.fields.insert(field.into(), value)
    }

    /// The stored value, else `default`, else `None`.
    pub fn get<'a>(&'a self, field: &str, default: Option<&'a V>) -> Option<&'a V> {
        self.fields.get(field).or(default)
    }

    /// Lookup for a caller-facing `get(field, default=None)` whose arguments
    /// were parsed by the caller. Never fails: a call with the wrong number of
    /// arguments or a field name that did not parse is logged and answers
    /// `None`.
    pub fn get_or_none<'a, E: fmt::Display>(
        &'a self,
        arity: usize,
        field: std::result::Result<String, E>,
        default: Option<&'a V>,
    ) -> Option<&'a V> {
        if !(1..=2).contains(&arity) {
            tracing::warn!(arguments = arity, "get expects a field name and an optional default");
            return None;
        }
        match field {
            Ok(field) => self.get(&field, default),
            Err(e) => {
                tracing::warn!(error = %e, "get could not parse its field name");
                None
            }
        }
    }

    pub fn fields(&self) -> &HashMap<String, V> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder used by engine-facing code to fill a box before handing it out.
pub struct ResultBoxBuilder<V> {
    inner: ResultBox<V>,
}

impl<V> Default for ResultBoxBuilder<V> {
    fn default() -> Self {
        Self {
            inner: ResultBox::new(),
        }
    }
}

impl<V> ResultBoxBuilder<V> {
    pub fn field(mut self, name: impl Into<String>, value: V) -> Self {
        self.inner.insert(name, value);
        self
    }

    pub fn build(self) -> ResultBox<V> {
        self.inner
    }
}

impl<V: fmt::Debug> fmt::Display for ResultBox<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.fields.keys().collect();
        keys.sort();
        f.write_str("result:{value={")?;
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}: {:?}", key, self.fields[key])?;
        }
        f.write_str("}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn missing_field_is_none_or_default() {
        let result: ResultBox<Value> = ResultBox::from_fields([("k", json!("v"))]);
        let fallback = json!(42);

        assert_eq!(result.get("k", None), Some(&json!("v")));
        assert_eq!(result.get("k", Some(&fallback)), Some(&json!("v")));
        assert_eq!(result.get("missing", None), None);
        assert_eq!(result.get("missing", Some(&fallback)), Some(&json!(42)));
    }

    #[test]
    fn malformed_get_calls_answer_none() {
        let result: ResultBox<Value> = ResultBox::from_fields([("k", json!("v"))]);
        let fallback = json!(42);
        let field = |name: &str| Ok::<_, String>(name.to_string());

        assert_eq!(result.get_or_none(1, field("k"), None), Some(&json!("v")));
        assert_eq!(
            result.get_or_none(2, field("missing"), Some(&fallback)),
            Some(&json!(42))
        );
        assert_eq!(result.get_or_none(0, field("k"), None), None);
        assert_eq!(result.get_or_none(3, field("k"), Some(&fallback)), None);
        assert_eq!(
            result.get_or_none(2, Err("field must be str, not int"), Some(&fallback)),
            None
        );
    }

    #[test]
    fn display_lists_fields_in_key_order() {
        let result = ResultBoxBuilder::default()
            .field("cas", json!(17))
            .field("key", json!("airline_10"))
            .build();
        assert_eq!(
            result.to_string(),
            r#"result:{value={"cas": Number(17), "key": String("airline_10")}}"#
        );
    }

    #[test]
    fn new_box_is_empty() {
        let result: ResultBox<Value> = ResultBox::new();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
    }
}

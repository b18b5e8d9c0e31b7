use std::collections::BTreeMap;

use serde::Serialize;

/// An ordered list of form-encoded request parameters.
///
/// Stripe uses bracket notation for nested values, so `metadata` maps become `metadata[key]=value` pairs.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<K: Into<String>, V: ToString>(&mut self, key: K, value: V) -> &mut Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn push_opt<K: Into<String>, V: ToString>(&mut self, key: K, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.push(key, v);
        }
        self
    }

    pub fn push_map<K: AsRef<str>>(&mut self, key: K, values: &BTreeMap<String, String>) -> &mut Self {
        for (k, v) in values {
            self.push(format!("{}[{k}]", key.as_ref()), v);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

//! # Path Variables
//!
//! Request paths may carry `{{name}}` placeholders (for example
//! `/pet/{{petId}}`) that are bound to resource identifiers before a request
//! spec is frozen. A placeholder still unbound at that point is an error.

use std::collections::BTreeMap;

use crate::error::{HarnessError, Result};

/// An ordered set of placeholder bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `value`, replacing any previous binding.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.values.insert(key, value.to_string());
    }

    /// Replace every bound `{{key}}` placeholder in `text`.
    pub fn interpolate(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (key, value) in &self.values {
            result = result.replace(&format!("{{{{{key}}}}}"), value);
        }
        result
    }

    /// Interpolate and fail on the first placeholder left unbound.
    pub fn resolve(&self, template: &str) -> Result<String> {
        let resolved = self.interpolate(template);
        match unresolved_placeholder(&resolved) {
            Some(name) => Err(HarnessError::UnboundPlaceholder {
                name,
                template: template.to_string(),
            }),
            None => Ok(resolved),
        }
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut variables = Variables::new();
        for (key, value) in iter {
            variables.set(key, value);
        }
        variables
    }
}

fn unresolved_placeholder(text: &str) -> Option<String> {
    let start = text.find("{{")?;
    let rest = &text[start + 2..];
    let end = rest.find("}}")?;
    Some(rest[..end].to_string())
}

//! Run variables, `${name}` templating and response captures

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::common::{Error, Result};

/// Fields tried, in order, when a capture names a bare `id`-like key
const ID_FIELDS: &[&str] = &[
    "id",
    "agent_id",
    "workflow_id",
    "skill_id",
    "document_id",
    "config_id",
    "_id",
];

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").unwrap())
}

/// Variables visible to a suite's cases
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, Value>,
}

impl Variables {
    /// Variables every suite starts with
    pub fn for_run(run_id: &str, timestamp: &str) -> Self {
        let mut vars = Self::default();
        vars.set("run_id", Value::String(run_id.to_string()));
        vars.set("timestamp", Value::String(timestamp.to_string()));
        vars
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Replace every `${name}` in `text`
    pub fn render(&self, text: &str) -> Result<String> {
        let mut missing = None;
        let rendered = placeholder().replace_all(text, |caps: &Captures| {
            match self.values.get(&caps[1]) {
                Some(value) => value_to_string(value),
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(Error::UnresolvedVariable(name)),
            None => Ok(rendered.into_owned()),
        }
    }

    /// Render every string inside a JSON value
    ///
    /// A string that is exactly one placeholder takes the variable's JSON
    /// value as-is, so numeric ids stay numeric.
    pub fn render_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(text) => {
                if let Some(caps) = placeholder().captures(text) {
                    if caps.get(0).map(|m| m.as_str().len()) == Some(text.len()) {
                        return self
                            .values
                            .get(&caps[1])
                            .cloned()
                            .ok_or_else(|| Error::UnresolvedVariable(caps[1].to_string()));
                    }
                }
                self.render(text).map(Value::String)
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.render_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.render_value(item)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Pull a value out of a response body
///
/// `selector` is either a JSON pointer (`/data/id`) or a bare key. A bare
/// key is looked up at the top level and under `data`; bare `id`-style
/// keys also fall back to the usual id field names.
pub fn capture(body: &Value, selector: &str) -> Option<Value> {
    if selector.starts_with('/') {
        return body.pointer(selector).filter(|v| !v.is_null()).cloned();
    }

    let lookup = |key: &str| {
        body.get(key)
            .or_else(|| body.get("data").and_then(|data| data.get(key)))
            .filter(|v| !v.is_null())
            .cloned()
    };

    if let Some(value) = lookup(selector) {
        return Some(value);
    }
    if selector == "id" || selector.ends_with("_id") {
        return ID_FIELDS.iter().find_map(|field| lookup(field));
    }
    None
}

/// Overlay `overlay` onto `base`, recursing into objects
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Strings render without quotes, everything else as compact JSON
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

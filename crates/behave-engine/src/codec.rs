//! Attribute codec
//!
//! Directive strings (`data-behaves="event:behavior;..."`) and scalar
//! configuration attributes (`data-confirm`, `data-method`, ...). Malformed
//! directive data is tolerated by truncation, never reported: markup may
//! legitimately reference behaviors that are not registered on every page.

use behave_dom::{DomTree, NodeId};

/// Attribute carrying an element's directive list
pub const BEHAVIOR_ATTR: &str = "data-behaves";
/// Marker attribute written on click-delegation roots
pub const DELEGATED_ATTR: &str = "data-delegated";
/// Prefix for scalar configuration attributes
pub const CONFIG_PREFIX: &str = "data-";
/// The one event that is always delegated, never bound directly
pub const CLICK_EVENT: &str = "click";
/// The pseudo-event run at attach time
pub const READY_EVENT: &str = "ready";

/// Decode an element's directive list into (event, behavior) pairs.
///
/// The raw string is split on `;` and `:` into a flat token list; a
/// trailing unpaired token is dropped. An absent or empty attribute yields
/// an empty list.
pub fn decode_directives(tree: &DomTree, id: NodeId) -> Vec<(String, String)> {
    match tree.attr(id, BEHAVIOR_ATTR) {
        Some(raw) => decode(raw),
        None => Vec::new(),
    }
}

fn decode(raw: &str) -> Vec<(String, String)> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let mut tokens: Vec<&str> = raw.split([';', ':']).collect();
    if tokens.len() % 2 != 0 {
        tokens.pop();
    }
    tokens
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect()
}

/// Whether the element declares any event:behavior pair
pub fn has_behaviors(tree: &DomTree, id: NodeId) -> bool {
    tree.attr(id, BEHAVIOR_ATTR)
        .is_some_and(|raw| raw.contains(':'))
}

/// The behavior name bound to the click event, if any
pub fn click_behavior_name(tree: &DomTree, id: NodeId) -> Option<String> {
    decode_directives(tree, id)
        .into_iter()
        .find(|(event, _)| event == CLICK_EVENT)
        .map(|(_, name)| name)
}

/// Scalar configuration value read from a `data-` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Str(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }

    /// String form, as it would appear in markup
    pub fn into_string(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s,
        }
    }

    /// Falsy values are `false` and the empty string
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Str(s) => !s.is_empty(),
        }
    }
}

/// Read a configuration attribute; the literal strings `"true"` and
/// `"false"` coerce to booleans, anything else passes through unchanged.
/// An absent or empty attribute yields `None`.
pub fn read_config(tree: &DomTree, id: NodeId, key: &str) -> Option<ConfigValue> {
    let value = tree.attr(id, &config_attr(key))?;
    if value.is_empty() {
        return None;
    }
    Some(match value {
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        other => ConfigValue::Str(other.to_string()),
    })
}

/// Read a configuration attribute with a caller-supplied default
pub fn read_config_or(tree: &DomTree, id: NodeId, key: &str, default: ConfigValue) -> ConfigValue {
    read_config(tree, id, key).unwrap_or(default)
}

/// Write a configuration attribute; `None` clears it to the empty string
pub fn write_config(tree: &mut DomTree, id: NodeId, key: &str, value: Option<&str>) {
    tree.set_attr(id, &config_attr(key), value.unwrap_or(""));
}

fn config_attr(key: &str) -> String {
    format!("{CONFIG_PREFIX}{key}")
}

/// Decode the JSON-array popup configuration `[windowName, windowOptions?]`
pub fn popup_params(raw: &str) -> Option<(String, String)> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let array = value.as_array()?;
    let name = array.first()?.as_str()?.to_string();
    let options = array
        .get(1)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    Some((name, options))
}

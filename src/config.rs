//! Runtime configuration.
//!
//! Everything here has a default, so a config file only needs the keys it
//! wants to change:
//!
//! ```toml
//! default_events = ["click", "input"]
//!
//! [attributes]
//! component = "data-island"
//! negation = "not:"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Attribute names the engine reads from markup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Marks an element as the root of a component instance.
    pub component: String,
    /// Marks an element as an interaction trigger; value is the action name.
    pub action: String,
    /// URL of the component's behavior script.
    pub source: String,
    /// When to load the behavior script: eager, interaction, visible, idle.
    pub strategy: String,
    /// Text binding; value is a state key.
    pub text: String,
    /// List-repeat container; value is a state key holding an array.
    pub list: String,
    /// Conditional presence; value is a state key, optionally negated.
    pub conditional: String,
    /// Prefix on a conditional key that inverts it.
    pub negation: String,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            component: "data-component".to_string(),
            action: "data-action".to_string(),
            source: "data-src".to_string(),
            strategy: "data-load".to_string(),
            text: "data-bind".to_string(),
            list: "data-each".to_string(),
            conditional: "data-if".to_string(),
            negation: "!".to_string(),
        }
    }
}

impl Attributes {
    /// Split a conditional attribute value into `(negated, key)`.
    pub fn split_negation<'a>(&self, raw: &'a str) -> (bool, &'a str) {
        if self.negation.is_empty() {
            return (false, raw);
        }
        match raw.strip_prefix(self.negation.as_str()) {
            Some(key) => (true, key),
            None => (false, raw),
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Markup attribute names.
    pub attributes: Attributes,

    /// Event types subscribed at start, before any component has registered.
    /// Interaction-strategy components can only be woken by event types that
    /// already have a subscription.
    pub default_events: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            attributes: Attributes::default(),
            default_events: ["click", "input", "change", "submit", "keydown"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

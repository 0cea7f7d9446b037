//! CSS property metadata: shorthand → longhand expansion.
//!
//! The table is keyed by property name and shaped like the MDN
//! `css/properties.json` data set. Only three fields are read:
//!
//! - `computed`: either a list of the longhand properties a shorthand sets,
//!   or a single descriptive string for longhands. Anything that is not a
//!   non-empty list of strings means "the property itself".
//! - `status`: `standard`, `nonstandard`, `experimental` or `obsolete`.
//! - `alsoAppliesTo`: pseudo-elements the property also applies to.
//!
//! A copy of the table is embedded in the crate, see
//! [`PropertyRegistry::embedded`].

use std::collections::HashMap;

use serde::Deserialize;

/// The embedded property table.
pub const EMBEDDED_PROPERTIES: &str = include_str!("../../data/properties.json");

/// Errors from loading a property table.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid property table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("property table must be a JSON object keyed by property name")]
    NotAnObject,
}

/// Standardization status of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Standard,
    Nonstandard,
    Experimental,
    Obsolete,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProperty {
    #[serde(default)]
    computed: serde_json::Value,
    #[serde(default)]
    status: Status,
    #[serde(default)]
    also_applies_to: Vec<String>,
}

/// Metadata for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    /// Longhands this property sets; `[name]` for a longhand.
    pub computed: Vec<String>,
    pub status: Status,
    /// Pseudo-elements such as `::first-letter`.
    pub also_applies_to: Vec<String>,
}

impl Property {
    fn from_raw(name: &str, raw: RawProperty) -> Self {
        Self {
            name: name.to_string(),
            computed: normalize_computed(name, raw.computed),
            status: raw.status,
            also_applies_to: raw.also_applies_to,
        }
    }

    /// Returns `true` if this property expands to other properties.
    pub fn is_shorthand(&self) -> bool {
        self.computed.len() != 1 || self.computed[0] != self.name
    }
}

fn normalize_computed(name: &str, computed: serde_json::Value) -> Vec<String> {
    match serde_json::from_value::<Vec<String>>(computed) {
        Ok(list) if !list.is_empty() => list,
        _ => vec![name.to_string()],
    }
}

/// Immutable property-name → [`Property`] table.
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    properties: HashMap<String, Property>,
}

impl PropertyRegistry {
    /// Load a table from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(entries) = value else {
            return Err(RegistryError::NotAnObject);
        };
        let mut properties = HashMap::with_capacity(entries.len());
        for (name, entry) in entries {
            let raw: RawProperty = serde_json::from_value(entry)?;
            let property = Property::from_raw(&name, raw);
            properties.insert(name, property);
        }
        log::debug!("loaded {} property definitions", properties.len());
        Ok(Self { properties })
    }

    /// The table shipped with the crate.
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_json(EMBEDDED_PROPERTIES)
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// The longhands `name` resolves to, or `None` for an unknown property.
    pub fn computed(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(|p| p.computed.as_slice())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

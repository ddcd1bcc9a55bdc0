//! Property schemas for step and element definitions
//!
//! A definition declares the properties a modeler configures on each placed
//! instance. Schemas are fingerprinted with Blake3 so a saved model can be
//! checked against the definitions it was authored for.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

use super::error::{SchemaError, SchemaResult};

/// Schema fingerprint (hex-encoded Blake3 hash)
pub type Fingerprint = String;

/// Kind of a declared property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Expression evaluated at run time
    Expression,
    /// Literal string
    String,
    /// Literal real number
    Real,
    /// Reference to a state
    State,
    /// Reference to an element instance of the given definition
    Element {
        /// Unique id of the element definition
        definition: Uuid,
    },
    /// Repeating rows, each carrying the nested properties
    RepeatGroup {
        /// Row schema
        properties: PropertySchema,
    },
}

/// A single property declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Property name, unique within its schema
    pub name: String,
    /// Property kind
    pub kind: PropertyKind,
    /// Whether a value must be supplied
    pub required: bool,
    /// Default value text
    pub default: Option<String>,
}

/// Ordered collection of property declarations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    properties: Vec<PropertyDefinition>,
}

impl PropertySchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expression property with a default value
    pub fn add_expression(
        &mut self,
        name: &str,
        default: &str,
    ) -> SchemaResult<&mut PropertyDefinition> {
        self.add(name, PropertyKind::Expression, Some(default.to_string()))
    }

    /// Add a literal string property
    pub fn add_string(&mut self, name: &str, default: &str) -> SchemaResult<&mut PropertyDefinition> {
        self.add(name, PropertyKind::String, Some(default.to_string()))
    }

    /// Add a literal real property
    pub fn add_real(&mut self, name: &str, default: f64) -> SchemaResult<&mut PropertyDefinition> {
        self.add(name, PropertyKind::Real, Some(default.to_string()))
    }

    /// Add a state reference property
    pub fn add_state(&mut self, name: &str) -> SchemaResult<&mut PropertyDefinition> {
        self.add(name, PropertyKind::State, None)
    }

    /// Add an element reference property
    pub fn add_element(
        &mut self,
        name: &str,
        definition: Uuid,
    ) -> SchemaResult<&mut PropertyDefinition> {
        self.add(name, PropertyKind::Element { definition }, None)
    }

    /// Add a repeat group whose rows follow `rows`
    pub fn add_repeat_group(
        &mut self,
        name: &str,
        rows: PropertySchema,
    ) -> SchemaResult<&mut PropertyDefinition> {
        self.add(name, PropertyKind::RepeatGroup { properties: rows }, None)
    }

    fn add(
        &mut self,
        name: &str,
        kind: PropertyKind,
        default: Option<String>,
    ) -> SchemaResult<&mut PropertyDefinition> {
        if self.get(name).is_some() {
            return Err(SchemaError::DuplicateProperty(name.to_string()));
        }
        self.properties.push(PropertyDefinition {
            name: name.to_string(),
            kind,
            required: false,
            default,
        });
        let last = self.properties.len() - 1;
        Ok(&mut self.properties[last])
    }

    /// Look up a property by name
    pub fn get(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterate over declared properties in order
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.properties.iter()
    }

    /// Number of declared properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no properties are declared
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn write_canonical(&self, out: &mut String) {
        for prop in &self.properties {
            let _ = write!(out, "{}:", prop.name);
            match &prop.kind {
                PropertyKind::Expression => out.push_str("expr"),
                PropertyKind::String => out.push_str("string"),
                PropertyKind::Real => out.push_str("real"),
                PropertyKind::State => out.push_str("state"),
                PropertyKind::Element { definition } => {
                    let _ = write!(out, "element<{}>", definition);
                }
                PropertyKind::RepeatGroup { properties } => {
                    out.push_str("group[");
                    properties.write_canonical(out);
                    out.push(']');
                }
            }
            let _ = write!(
                out,
                ":{}:{};",
                if prop.required { "req" } else { "opt" },
                prop.default.as_deref().unwrap_or("")
            );
        }
    }
}

/// Compute a stable fingerprint for a definition's schema
pub fn fingerprint(name: &str, unique_id: Uuid, schema: &PropertySchema) -> Fingerprint {
    let mut canonical = String::new();
    schema.write_canonical(&mut canonical);

    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(unique_id.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertySchema {
        let mut schema = PropertySchema::new();
        schema.add_expression("Name", "\"ABC\"").unwrap().required = true;
        schema.add_state("Response").unwrap().required = true;
        schema
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let mut schema = sample();
        let err = schema.add_state("Response").unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateProperty(name) if name == "Response"));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_fingerprint_stability() {
        let id = Uuid::nil();
        assert_eq!(fingerprint("S", id, &sample()), fingerprint("S", id, &sample()));
    }

    #[test]
    fn test_fingerprint_tracks_schema_changes() {
        let id = Uuid::nil();
        let base = fingerprint("S", id, &sample());

        let mut changed = sample();
        changed.add_real("Extra", 1.0).unwrap();
        assert_ne!(base, fingerprint("S", id, &changed));

        let mut optional = PropertySchema::new();
        optional.add_expression("Name", "\"ABC\"").unwrap();
        optional.add_state("Response").unwrap().required = true;
        assert_ne!(base, fingerprint("S", id, &optional));
    }

    #[test]
    fn test_nested_group_lookup() {
        let mut rows = PropertySchema::new();
        rows.add_element("Item", Uuid::nil()).unwrap();
        let mut schema = PropertySchema::new();
        schema.add_repeat_group("Items", rows).unwrap();

        match &schema.get("Items").unwrap().kind {
            PropertyKind::RepeatGroup { properties } => assert!(properties.get("Item").is_some()),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}

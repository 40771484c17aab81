//! Schema metadata consumed by the compiler
//!
//! The schema registry itself lives outside this crate; the compiler only
//! reads schemas through [`SchemaStore`].

mod attribute;
mod store;

pub use attribute::{Attribute, ChoiceOption, DateFormat, Discriminant, ReferenceKind};
pub use store::{InMemorySchemaStore, SchemaStore};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::filter::FilterError;

/// Entity schema: logical name plus attribute metadata
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub logical_name: String,
    pub attributes: FxHashMap<String, Attribute>,
    pub id_attribute: String,
    pub primary_attribute: String,
}

impl Schema {
    pub fn new(
        logical_name: impl Into<String>,
        id_attribute: impl Into<String>,
        primary_attribute: impl Into<String>,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            attributes: FxHashMap::default(),
            id_attribute: id_attribute.into(),
            primary_attribute: primary_attribute.into(),
        }
    }

    /// Builder-style attribute registration
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Check that the id/primary attributes exist and lookups name a target
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.logical_name.trim().is_empty() {
            return Err(FilterError::InvalidSchema(
                "logical name cannot be empty".to_string(),
            ));
        }
        for (role, name) in [
            ("id", &self.id_attribute),
            ("primary", &self.primary_attribute),
        ] {
            if !self.attributes.contains_key(name) {
                return Err(FilterError::InvalidSchema(format!(
                    "{} attribute '{}' is not defined on '{}'",
                    role, name, self.logical_name
                )));
            }
        }
        for (name, attribute) in &self.attributes {
            match attribute {
                Attribute::Lookup { target, .. } if target.trim().is_empty() => {
                    return Err(FilterError::InvalidSchema(format!(
                        "lookup '{}' on '{}' has no target",
                        name, self.logical_name
                    )));
                }
                Attribute::Choice { options } | Attribute::Choices { options }
                    if !uniform_options(options) =>
                {
                    return Err(FilterError::InvalidSchema(format!(
                        "options of '{}' on '{}' must be all strings or all numbers",
                        name, self.logical_name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Option values share one scalar type: all strings or all numbers
fn uniform_options(options: &[ChoiceOption]) -> bool {
    options.iter().all(|o| o.value.is_string()) || options.iter().all(|o| o.value.is_number())
}

//! Schema lookup

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use super::Schema;
use crate::filter::FilterError;

/// Read-only access to entity schemas by logical name
pub trait SchemaStore: Send + Sync {
    fn get_schema(&self, logical_name: &str) -> Option<Arc<Schema>>;
}

/// Schema store backed by a hash map
#[derive(Debug, Default, Clone)]
pub struct InMemorySchemaStore {
    schemas: FxHashMap<String, Arc<Schema>>,
}

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    schemas: Vec<Schema>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a schema, replacing any schema with the same name
    pub fn insert(&mut self, schema: Schema) -> Result<(), FilterError> {
        schema.validate()?;
        tracing::trace!(schema = %schema.logical_name, "Registered schema");
        self.schemas
            .insert(schema.logical_name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Build a store from schemas, validating each
    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> Result<Self, FilterError> {
        let mut store = Self::new();
        for schema in schemas {
            store.insert(schema)?;
        }
        Ok(store)
    }

    /// Parse a `{ "schemas": [...] }` document
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        let document: SchemaDocument = serde_json::from_str(json)
            .map_err(|e| FilterError::InvalidSchema(e.to_string()))?;
        Self::from_schemas(document.schemas)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn get_schema(&self, logical_name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(logical_name).cloned()
    }
}

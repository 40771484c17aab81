//! Condition and filter-tree compilation
//!
//! Validation, compatibility checks and extended-key resolution happen here
//! once for every adapter; adapters only build predicate shapes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::error::FilterError;
use super::input::{ConditionInput, FieldRef};
use super::operator::{Compatibility, Operator};
use super::types::{Condition, Filter};
use crate::adapters::Adapter;
use crate::core::constants::DEFAULT_TIMEZONE;
use crate::dates::{CalendarSettings, Clock, DateContext, SystemClock};
use crate::schema::{Attribute, Schema, SchemaStore};
use crate::utils::time::parse_timezone;

/// Per-call compile options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// IANA timezone for datetime attributes
    pub timezone: String,
}

impl CompileOptions {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

/// Join/lookup the predicate depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationRef {
    pub alias: String,
    /// Lookup field on the base schema
    pub field: String,
    /// Logical name of the related schema
    pub target: String,
}

/// Predicate plus the relations the executor must attach
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter<P> {
    /// `None` matches everything
    pub predicate: Option<P>,
    pub relations: Vec<RelationRef>,
}

/// State read once at the start of a compile call
struct Pass<S> {
    dates: DateContext,
    session: S,
}

/// Compiles filters into predicates for one adapter
pub struct FilterCompiler<A: Adapter> {
    adapter: A,
    schemas: Arc<dyn SchemaStore>,
    clock: Arc<dyn Clock>,
    settings: CalendarSettings,
}

impl<A: Adapter> FilterCompiler<A> {
    pub fn new(adapter: A, schemas: Arc<dyn SchemaStore>) -> Self {
        Self {
            adapter,
            schemas,
            clock: Arc::new(SystemClock),
            settings: CalendarSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: CalendarSettings) -> Self {
        self.settings = settings;
        self
    }

    fn begin(&self, options: &CompileOptions) -> Result<Pass<A::Session>, FilterError> {
        let tz = parse_timezone(&options.timezone).ok_or_else(|| FilterError::InvalidTimezone {
            timezone: options.timezone.clone(),
        })?;
        Ok(Pass {
            dates: DateContext::new(self.clock.now(), tz, self.settings),
            session: self.adapter.session(),
        })
    }

    /// Compile a single condition against its attribute
    ///
    /// The field is addressed unqualified; `extendedKey` is not resolved here.
    pub fn compile_condition(
        &self,
        condition: &Condition,
        attribute: Option<&Attribute>,
        options: &CompileOptions,
    ) -> Result<Option<A::Predicate>, FilterError> {
        let pass = self.begin(options)?;
        self.condition(
            &pass,
            FieldRef::bare(condition.field.clone()),
            condition,
            attribute,
        )
    }

    /// Compile a filter tree; `None` means "match everything"
    pub fn compile_filter(
        &self,
        filter: &Filter,
        schema: &Schema,
        options: &CompileOptions,
    ) -> Result<Option<A::Predicate>, FilterError> {
        Ok(self.plan_filter(filter, schema, options)?.predicate)
    }

    /// Compile a filter tree and report the relations it dereferences
    pub fn plan_filter(
        &self,
        filter: &Filter,
        schema: &Schema,
        options: &CompileOptions,
    ) -> Result<CompiledFilter<A::Predicate>, FilterError> {
        let pass = self.begin(options)?;
        let mut relations = Vec::new();
        let predicate = self.node(&pass, filter, schema, &mut relations)?;

        tracing::debug!(
            adapter = self.adapter.name(),
            schema = %schema.logical_name,
            conditions = filter.condition_count(),
            relations = relations.len(),
            empty = predicate.is_none(),
            "Compiled filter"
        );

        Ok(CompiledFilter {
            predicate,
            relations,
        })
    }

    fn node(
        &self,
        pass: &Pass<A::Session>,
        filter: &Filter,
        schema: &Schema,
        relations: &mut Vec<RelationRef>,
    ) -> Result<Option<A::Predicate>, FilterError> {
        let mut parts = Vec::with_capacity(filter.conditions.len() + filter.filters.len());
        for condition in &filter.conditions {
            if let Some(predicate) = self.tree_condition(pass, condition, schema, relations)? {
                parts.push(predicate);
            }
        }
        for child in &filter.filters {
            if let Some(predicate) = self.node(pass, child, schema, relations)? {
                parts.push(predicate);
            }
        }
        Ok(self.adapter.combine(filter.kind, parts))
    }

    fn tree_condition(
        &self,
        pass: &Pass<A::Session>,
        condition: &Condition,
        schema: &Schema,
        relations: &mut Vec<RelationRef>,
    ) -> Result<Option<A::Predicate>, FilterError> {
        let Some(key) = &condition.extended_key else {
            let field = FieldRef {
                qualifier: self.adapter.qualifier(schema),
                name: condition.field.clone(),
            };
            return self.condition(pass, field, condition, schema.attribute(&condition.field));
        };

        let lookup = schema
            .attribute(&condition.field)
            .ok_or_else(|| FilterError::attribute_not_found(&condition.field))?;
        let Attribute::Lookup { target, .. } = lookup else {
            return Err(FilterError::invalid_type(
                condition.operator.key(),
                &condition.field,
                lookup.type_name(),
            ));
        };
        let related = self
            .schemas
            .get_schema(target)
            .ok_or_else(|| FilterError::SchemaNotFound {
                name: target.clone(),
            })?;
        let alias = self
            .adapter
            .relation_alias(schema, &condition.field, &related);

        let field = FieldRef::qualified(alias.clone(), key.clone());
        let predicate = self.condition(pass, field, condition, related.attribute(key))?;

        if predicate.is_some() && !relations.iter().any(|r| r.alias == alias) {
            relations.push(RelationRef {
                alias,
                field: condition.field.clone(),
                target: related.logical_name.clone(),
            });
        }
        Ok(predicate)
    }

    fn condition(
        &self,
        pass: &Pass<A::Session>,
        field: FieldRef,
        condition: &Condition,
        attribute: Option<&Attribute>,
    ) -> Result<Option<A::Predicate>, FilterError> {
        let shown = condition.display_field();
        let attribute = attribute.ok_or_else(|| FilterError::attribute_not_found(&shown))?;
        let operator = normalize(&condition.operator, &condition.value);

        if let Operator::Ignored(key) = &operator {
            tracing::warn!(field = %shown, operator = %key, "Ignoring unknown operator");
            return Ok(None);
        }

        if operator.requires_array()
            && !matches!(&condition.value, JsonValue::Array(values) if !values.is_empty())
        {
            return Err(FilterError::invalid_value(
                operator.key(),
                "expected a non-empty array",
            ));
        }

        match operator.compatibility(attribute) {
            Compatibility::Allowed => {}
            Compatibility::Degrade => {
                tracing::debug!(
                    field = %shown,
                    operator = %operator,
                    attribute_type = attribute.type_name(),
                    "Dropping condition not applicable to attribute type"
                );
                return Ok(None);
            }
            Compatibility::Rejected => {
                return Err(FilterError::invalid_type(
                    operator.key(),
                    shown,
                    attribute.type_name(),
                ));
            }
        }

        let dates = match attribute.date_format() {
            Some(format) => pass.dates.for_format(format),
            None => pass.dates,
        };
        let input = ConditionInput {
            field,
            display: shown,
            attribute,
            value: &condition.value,
            operator: &operator,
            dates,
        };
        let predicate = self.adapter.transform(&pass.session, &operator, &input)?;

        tracing::trace!(
            field = %input.display,
            operator = %operator,
            predicate = ?predicate,
            "Compiled condition"
        );
        Ok(predicate)
    }
}

/// `eq null` / `ne null` are null checks
fn normalize(operator: &Operator, value: &JsonValue) -> Operator {
    match (operator, value) {
        (Operator::Eq, JsonValue::Null) => Operator::Null,
        (Operator::Ne, JsonValue::Null) => Operator::NotNull,
        (operator, _) => operator.clone(),
    }
}

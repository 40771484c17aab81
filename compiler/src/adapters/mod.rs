//! Backend adapters
//!
//! An adapter turns one validated condition into its engine-native predicate
//! and composes predicates with AND/OR. Both adapters must select the same
//! records for the same abstract filter.

pub mod document;
pub mod relational;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use document::DocumentAdapter;
pub use relational::RelationalAdapter;

use std::fmt::Debug;

use crate::filter::{ConditionInput, FilterError, FilterType, Operator};
use crate::schema::Schema;

/// Predicate builder for one storage engine
pub trait Adapter: Send + Sync {
    /// Engine-native predicate; opaque to the compiler
    type Predicate: Clone + Debug + PartialEq + Send;

    /// State captured once at the start of every compile call
    type Session;

    fn name(&self) -> &'static str;

    fn session(&self) -> Self::Session;

    /// Qualifier for base-schema fields (`None` leaves them bare)
    fn qualifier(&self, schema: &Schema) -> Option<String>;

    /// Alias under which the related record of a lookup is reachable
    fn relation_alias(&self, schema: &Schema, field: &str, target: &Schema) -> String;

    /// Build the predicate for a validated condition; `None` contributes nothing
    fn transform(
        &self,
        session: &Self::Session,
        operator: &Operator,
        input: &ConditionInput<'_>,
    ) -> Result<Option<Self::Predicate>, FilterError>;

    /// AND/OR composition; `None` when there is nothing to combine
    fn combine(&self, kind: FilterType, predicates: Vec<Self::Predicate>)
    -> Option<Self::Predicate>;
}

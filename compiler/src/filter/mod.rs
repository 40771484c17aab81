//! Filter DSL and compiler
//!
//! A [`Filter`] is a JSON tree of conditions built per request. The
//! [`FilterCompiler`] validates it against schema metadata and hands each
//! condition to an adapter that emits engine-native predicates.

mod compiler;
mod error;
mod input;
mod operator;
mod parser;
mod types;


pub use compiler::{CompileOptions, CompiledFilter, FilterCompiler, RelationRef};
pub use error::FilterError;
pub use input::{ConditionInput, FieldRef, Scalar, UpperBound};
pub use operator::{Compatibility, Operator, OperatorGroup, TimeUnit};
pub use parser::{FilterLimits, parse_filter};
pub use types::{Condition, Filter, FilterType};

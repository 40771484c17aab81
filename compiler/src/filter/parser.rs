//! Filter parsing
//!
//! Parses JSON filter documents into [`Filter`] trees with size validation.

use serde::Deserialize;

use super::error::FilterError;
use super::types::Filter;
use crate::core::constants::{
    DEFAULT_MAX_CONDITIONS, DEFAULT_MAX_FILTER_DEPTH, MAX_FILTER_JSON_SIZE,
};

/// Upper bounds enforced before a filter is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FilterLimits {
    pub max_filter_bytes: usize,
    pub max_conditions: usize,
    pub max_depth: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_filter_bytes: MAX_FILTER_JSON_SIZE,
            max_conditions: DEFAULT_MAX_CONDITIONS,
            max_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }
}

impl FilterLimits {
    /// Check an already-built filter against the count and depth limits
    pub fn check(&self, filter: &Filter) -> Result<(), FilterError> {
        let count = filter.condition_count();
        if count > self.max_conditions {
            return Err(FilterError::InvalidFilter(format!(
                "Maximum {} conditions allowed, got {}",
                self.max_conditions, count
            )));
        }

        let depth = filter.depth();
        if depth > self.max_depth {
            return Err(FilterError::InvalidFilter(format!(
                "Maximum nesting depth is {}, got {}",
                self.max_depth, depth
            )));
        }

        Ok(())
    }
}

/// Parse a filter from JSON
///
/// Validates JSON size, parses into a Filter tree, and checks count/depth limits.
pub fn parse_filter(json_str: &str, limits: &FilterLimits) -> Result<Filter, FilterError> {
    if json_str.len() > limits.max_filter_bytes {
        return Err(FilterError::InvalidFilter(format!(
            "Filter JSON exceeds maximum size of {} bytes",
            limits.max_filter_bytes
        )));
    }

    let filter: Filter =
        serde_json::from_str(json_str).map_err(|e| FilterError::InvalidFilter(e.to_string()))?;

    limits.check(&filter)?;

    tracing::trace!(
        conditions = filter.condition_count(),
        depth = filter.depth(),
        "Parsed filter"
    );

    Ok(filter)
}

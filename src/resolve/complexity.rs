//! Cost estimate of a request, checked before resolution starts
//!
//! Every leaf costs the current multiplier. List fields multiply the
//! multiplier by their requested size (`limit`, `first` or `last`), or by a
//! default when none is given, so nested lists grow the cost
//! geometrically.

use super::selection::{
    is_introspection_field, is_leaf_field, Document, Field, Selection, SelectionSet,
};
use super::{ResolveError, ResolveResult};
use crate::config::{ConfigError, ConfigResult};
use tracing::warn;

/// Field names known to return lists
const LIST_FIELDS: &[&str] = &["edges", "outgoingEdges", "incomingEdges", "edgesConnection"];

const SIZE_ARGUMENTS: &[&str] = &["limit", "first", "last"];

/// Known list fields, plus non-leaf names ending in `s` or `Connection`
pub fn is_list_field(name: &str) -> bool {
    if LIST_FIELDS.contains(&name) {
        return true;
    }
    if is_leaf_field(name) {
        return false;
    }
    name.ends_with('s') || name.ends_with("Connection")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexityGuard {
    max_complexity: usize,
    default_list_limit: usize,
}

impl ComplexityGuard {
    pub fn new(max_complexity: usize, default_list_limit: usize) -> ConfigResult<Self> {
        if max_complexity == 0 {
            return Err(ConfigError::InvalidMaxComplexity);
        }
        Ok(Self {
            max_complexity,
            default_list_limit: default_list_limit.max(1),
        })
    }

    pub fn max_complexity(&self) -> usize {
        self.max_complexity
    }

    /// Total score summed over all operations
    pub fn complexity(&self, document: &Document) -> usize {
        document
            .operations
            .iter()
            .fold(0usize, |total, operation| {
                total.saturating_add(self.selection_set_cost(operation, 1))
            })
    }

    pub fn check(&self, document: &Document) -> ResolveResult<usize> {
        let complexity = self.complexity(document);
        if complexity > self.max_complexity {
            warn!(
                "Rejecting request: complexity {} exceeds {}",
                complexity, self.max_complexity
            );
            return Err(ResolveError::ComplexityExceeded {
                complexity,
                max: self.max_complexity,
            });
        }
        Ok(complexity)
    }

    fn selection_set_cost(&self, selections: &SelectionSet, multiplier: usize) -> usize {
        let mut cost = 0usize;

        for selection in selections {
            let item = match selection {
                Selection::Field(field) => self.field_cost(field, multiplier),
                Selection::InlineFragment { selection_set, .. } => {
                    self.selection_set_cost(selection_set, multiplier)
                }
                Selection::FragmentSpread { .. } => multiplier,
            };
            cost = cost.saturating_add(item);
        }

        cost
    }

    fn field_cost(&self, field: &Field, multiplier: usize) -> usize {
        if is_introspection_field(&field.name) {
            return 1;
        }
        if is_leaf_field(&field.name) {
            return multiplier;
        }

        let field_multiplier = if is_list_field(&field.name) {
            multiplier.saturating_mul(self.list_size(field))
        } else {
            multiplier
        };

        match field.children() {
            Some(children) => self.selection_set_cost(children, field_multiplier),
            None => field_multiplier,
        }
    }

    /// First positive integer size argument, else the default
    fn list_size(&self, field: &Field) -> usize {
        field
            .arguments
            .iter()
            .filter(|(name, _)| SIZE_ARGUMENTS.contains(&name.as_str()))
            .find_map(|(_, value)| value.as_u64().filter(|n| *n > 0))
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(self.default_list_limit)
    }
}

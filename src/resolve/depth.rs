//! Relationship nesting limit checked before resolution starts

use super::selection::{is_introspection_field, is_leaf_field, Document, Selection, SelectionSet};
use super::{ResolveError, ResolveResult};
use crate::config::{ConfigError, ConfigResult};
use std::collections::HashSet;
use tracing::warn;

/// Rejects requests whose relationship nesting is deeper than `max_depth`.
///
/// Root fields sit at depth 0; each non-leaf field with a non-empty
/// sub-selection adds one level. Inline fragments add nothing, named
/// fragments are expanded where they are spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthGuard {
    max_depth: usize,
}

impl DepthGuard {
    pub fn new(max_depth: usize) -> ConfigResult<Self> {
        if max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(max_depth));
        }
        Ok(Self { max_depth })
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Deepest relationship level over all operations
    pub fn depth(&self, document: &Document) -> usize {
        let mut visiting = HashSet::new();
        document
            .operations
            .iter()
            .map(|operation| selection_set_depth(document, operation, 0, &mut visiting))
            .max()
            .unwrap_or(0)
    }

    /// Pass/fail check; returns the measured depth on success
    pub fn check(&self, document: &Document) -> ResolveResult<usize> {
        let depth = self.depth(document);
        if depth > self.max_depth {
            warn!("Rejecting request: depth {} exceeds {}", depth, self.max_depth);
            return Err(ResolveError::DepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        Ok(depth)
    }
}

fn selection_set_depth<'a>(
    document: &'a Document,
    selections: &'a SelectionSet,
    current: usize,
    visiting: &mut HashSet<&'a str>,
) -> usize {
    let mut deepest = current;

    for selection in selections {
        let depth = match selection {
            Selection::Field(field) => {
                if is_introspection_field(&field.name) || is_leaf_field(&field.name) {
                    continue;
                }
                match field.children() {
                    Some(children) => selection_set_depth(document, children, current + 1, visiting),
                    None => continue,
                }
            }
            Selection::InlineFragment { selection_set, .. } => {
                selection_set_depth(document, selection_set, current, visiting)
            }
            Selection::FragmentSpread { name } => match document.fragments.get_key_value(name) {
                Some((key, fragment)) => {
                    if !visiting.insert(key.as_str()) {
                        // cyclic spread
                        continue;
                    }
                    let depth = selection_set_depth(document, fragment, current, visiting);
                    visiting.remove(key.as_str());
                    depth
                }
                None => current + 1,
            },
        };
        deepest = deepest.max(depth);
    }

    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::selection::Field;

    /// persons { knows { knows { ... { name } } } } with `levels` relationship fields
    fn nested(levels: usize) -> Document {
        let mut selection = vec![Selection::leaf("name"), Selection::leaf("id")];
        for _ in 1..levels {
            selection = vec![Field::new("knows").select(selection).into()];
        }
        Document::query(vec![Field::new("persons").select(selection).into()])
    }

    #[test]
    fn test_rejects_non_positive_max_depth() {
        assert!(matches!(DepthGuard::new(0), Err(ConfigError::InvalidMaxDepth(0))));
        assert!(DepthGuard::new(1).is_ok());
    }

    #[test]
    fn test_three_levels() {
        let doc = nested(3);
        assert_eq!(DepthGuard::new(3).unwrap().depth(&doc), 3);

        let err = DepthGuard::new(2).unwrap().check(&doc).unwrap_err();
        assert_eq!(err, ResolveError::DepthExceeded { depth: 3, max: 2 });
        assert_eq!(DepthGuard::new(3).unwrap().check(&doc).unwrap(), 3);
    }

    #[test]
    fn test_leaf_fields_never_add_depth() {
        // leaf names are skipped even if a sub-selection is present
        let doc = Document::query(vec![Field::new("persons")
            .select(vec![
                Field::new("properties").select(vec![Selection::leaf("x")]).into(),
                Selection::leaf("id"),
                Selection::leaf("__typename"),
            ])
            .into()]);
        assert_eq!(DepthGuard::new(5).unwrap().depth(&doc), 1);
    }

    #[test]
    fn test_depth_is_max_over_branches() {
        let doc = Document::query(vec![Field::new("persons")
            .select(vec![
                Field::new("outgoingEdges").select(vec![Selection::leaf("id")]).into(),
                Field::new("friends")
                    .select(vec![Field::new("employer").select(vec![Selection::leaf("name")]).into()])
                    .into(),
            ])
            .into()]);
        assert_eq!(DepthGuard::new(5).unwrap().depth(&doc), 3);
    }

    #[test]
    fn test_inline_fragments_add_nothing() {
        let doc = Document::query(vec![Field::new("persons")
            .select(vec![Selection::inline(
                Some("Person"),
                vec![Field::new("knows").select(vec![Selection::leaf("id")]).into()],
            )])
            .into()]);
        assert_eq!(DepthGuard::new(5).unwrap().depth(&doc), 2);
    }

    #[test]
    fn test_fragment_spreads_expand_in_place() {
        let doc = Document::query(vec![Field::new("persons")
            .select(vec![Selection::spread("Friends")])
            .into()])
        .with_fragment(
            "Friends",
            vec![Field::new("knows")
                .select(vec![Field::new("knows").select(vec![Selection::leaf("id")]).into()])
                .into()],
        );
        assert_eq!(DepthGuard::new(5).unwrap().depth(&doc), 3);
    }

    #[test]
    fn test_unknown_spread_counts_one_level() {
        let doc = Document::query(vec![Field::new("persons")
            .select(vec![Selection::spread("Missing")])
            .into()]);
        assert_eq!(DepthGuard::new(5).unwrap().depth(&doc), 2);
    }

    #[test]
    fn test_cyclic_fragments_terminate() {
        let doc = Document::query(vec![Selection::spread("A")])
            .with_fragment("A", vec![Field::new("knows").select(vec![Selection::spread("B")]).into()])
            .with_fragment("B", vec![Field::new("knows").select(vec![Selection::spread("A")]).into()]);
        assert_eq!(DepthGuard::new(10).unwrap().depth(&doc), 2);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(DepthGuard::new(1).unwrap().depth(&Document::default()), 0);
    }
}

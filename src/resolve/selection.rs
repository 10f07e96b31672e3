//! Request selection tree handed over by the execution layer
//!
//! The execution layer parses the request document; this crate only needs
//! its shape (fields, arguments, fragments) to run the pre-execution
//! guards.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Field names that never carry a relationship selection
pub const LEAF_FIELDS: &[&str] = &[
    "id",
    "properties",
    "labels",
    "type",
    "weight",
    "fromNodeId",
    "toNodeId",
    "cursor",
    "name",
    "count",
];

pub fn is_leaf_field(name: &str) -> bool {
    LEAF_FIELDS.contains(&name)
}

/// Meta fields such as `__typename`
pub fn is_introspection_field(name: &str) -> bool {
    name.starts_with("__")
}

pub type SelectionSet = Vec<Selection>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selection {
    Field(Field),
    #[serde(rename_all = "camelCase")]
    InlineFragment {
        #[serde(default)]
        type_condition: Option<String>,
        selection_set: SelectionSet,
    },
    FragmentSpread {
        name: String,
    },
}

impl Selection {
    /// Scalar field with no sub-selection
    pub fn leaf(name: impl Into<String>) -> Self {
        Selection::Field(Field::new(name))
    }

    pub fn inline(type_condition: Option<&str>, selection_set: SelectionSet) -> Self {
        Selection::InlineFragment {
            type_condition: type_condition.map(str::to_string),
            selection_set,
        }
    }

    pub fn spread(name: impl Into<String>) -> Self {
        Selection::FragmentSpread { name: name.into() }
    }
}

impl From<Field> for Selection {
    fn from(field: Field) -> Self {
        Selection::Field(field)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Argument values with variables already substituted
    #[serde(default)]
    pub arguments: IndexMap<String, JsonValue>,
    #[serde(default)]
    pub selection_set: Option<SelectionSet>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn select(mut self, selection_set: SelectionSet) -> Self {
        self.selection_set = Some(selection_set);
        self
    }

    /// Name the result is reported under
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Non-empty sub-selection, if any
    pub fn children(&self) -> Option<&SelectionSet> {
        self.selection_set.as_ref().filter(|set| !set.is_empty())
    }
}

/// Operations plus the named fragments they may spread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub operations: Vec<SelectionSet>,
    #[serde(default)]
    pub fragments: HashMap<String, SelectionSet>,
}

impl Document {
    /// Single anonymous operation
    pub fn query(selection_set: SelectionSet) -> Self {
        Self {
            operations: vec![selection_set],
            fragments: HashMap::new(),
        }
    }

    pub fn with_fragment(mut self, name: impl Into<String>, selection_set: SelectionSet) -> Self {
        self.fragments.insert(name.into(), selection_set);
        self
    }

    pub fn fragment(&self, name: &str) -> Option<&SelectionSet> {
        self.fragments.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_and_introspection_names() {
        assert!(is_leaf_field("id"));
        assert!(is_leaf_field("fromNodeId"));
        assert!(!is_leaf_field("knows"));
        assert!(is_introspection_field("__typename"));
        assert!(!is_introspection_field("_private"));
    }

    #[test]
    fn test_field_builder() {
        let field = Field::new("persons")
            .alias("people")
            .arg("limit", json!(5))
            .select(vec![Selection::leaf("id")]);

        assert_eq!(field.response_key(), "people");
        assert_eq!(field.arguments["limit"], json!(5));
        assert_eq!(field.children().map(Vec::len), Some(1));
        assert!(Field::new("x").select(vec![]).children().is_none());
    }

    #[test]
    fn test_document_deserializes_from_json() {
        let doc: Document = serde_json::from_value(json!({
            "operations": [[
                {"kind": "field", "name": "persons", "arguments": {"first": 2}, "selectionSet": [
                    {"kind": "field", "name": "id"},
                    {"kind": "fragmentSpread", "name": "Friends"},
                    {"kind": "inlineFragment", "typeCondition": "Person", "selectionSet": [
                        {"kind": "field", "name": "name"}
                    ]}
                ]}
            ]],
            "fragments": {"Friends": [{"kind": "field", "name": "labels"}]}
        }))
        .unwrap();

        assert_eq!(doc.operations.len(), 1);
        assert!(doc.fragment("Friends").is_some());
        match &doc.operations[0][0] {
            Selection::Field(field) => {
                assert_eq!(field.name, "persons");
                assert_eq!(field.children().unwrap().len(), 3);
            }
            other => panic!("expected field, got {:?}", other),
        }
    }
}

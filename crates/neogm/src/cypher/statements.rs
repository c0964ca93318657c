// Dweve Neogm - Object-Graph Mapping for Property Graphs
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cypher statement types and builders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MappingError, Result};

/// A Cypher parameter value.
///
/// This is also the value type of entity properties and of properties
/// carried by query responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CypherValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    String(String),
    /// List value.
    List(Vec<CypherValue>),
    /// Map/object value.
    Map(BTreeMap<String, CypherValue>),
}

impl From<bool> for CypherValue {
    fn from(v: bool) -> Self {
        CypherValue::Bool(v)
    }
}

impl From<i64> for CypherValue {
    fn from(v: i64) -> Self {
        CypherValue::Int(v)
    }
}

impl From<i32> for CypherValue {
    fn from(v: i32) -> Self {
        CypherValue::Int(v as i64)
    }
}

impl From<f64> for CypherValue {
    fn from(v: f64) -> Self {
        CypherValue::Float(v)
    }
}

impl From<String> for CypherValue {
    fn from(v: String) -> Self {
        CypherValue::String(v)
    }
}

impl From<&str> for CypherValue {
    fn from(v: &str) -> Self {
        CypherValue::String(v.to_string())
    }
}

impl<T: Into<CypherValue>> From<Vec<T>> for CypherValue {
    fn from(v: Vec<T>) -> Self {
        CypherValue::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<CypherValue>> From<Option<T>> for CypherValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(x) => x.into(),
            None => CypherValue::Null,
        }
    }
}

impl From<BTreeMap<String, CypherValue>> for CypherValue {
    fn from(v: BTreeMap<String, CypherValue>) -> Self {
        CypherValue::Map(v)
    }
}

impl CypherValue {
    /// Convert to Cypher literal syntax.
    pub fn to_cypher_literal(&self) -> String {
        match self {
            CypherValue::Null => "null".to_string(),
            CypherValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            CypherValue::Int(i) => i.to_string(),
            CypherValue::Float(f) => {
                if f.is_nan() {
                    "0.0/0.0".to_string()
                } else if f.is_infinite() {
                    if *f > 0.0 {
                        "1.0/0.0".to_string()
                    } else {
                        "-1.0/0.0".to_string()
                    }
                } else {
                    let s = f.to_string();
                    if s.contains('.') || s.contains('e') || s.contains('E') {
                        s
                    } else {
                        format!("{}.0", s)
                    }
                }
            }
            CypherValue::String(s) => super::escape::quote_string(s),
            CypherValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.to_cypher_literal()).collect();
                format!("[{}]", inner.join(", "))
            }
            CypherValue::Map(map) => {
                let pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "{}: {}",
                            super::escape::escape_identifier(k),
                            v.to_cypher_literal()
                        )
                    })
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
        }
    }

    /// Name of the value's kind, used in conversion messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CypherValue::Null => "null",
            CypherValue::Bool(_) => "bool",
            CypherValue::Int(_) => "int",
            CypherValue::Float(_) => "float",
            CypherValue::String(_) => "string",
            CypherValue::List(_) => "list",
            CypherValue::Map(_) => "map",
        }
    }

    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, CypherValue::Null)
    }

    /// Try to get as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CypherValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CypherValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CypherValue::Float(f) => Some(*f),
            CypherValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CypherValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// The kind of clause a statement carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    /// Insert of a node with no database identity.
    CreateNode,
    /// Match-and-set of a node that already has an identity.
    UpdateNode,
    /// Creation of a relationship.
    CreateRelationship,
    /// Property update of an existing relationship entity.
    UpdateRelationship,
    /// Removal of a relationship.
    DeleteRelationship,
    /// Removal of a node and its relationships.
    DeleteNode,
    /// Trailing projection of the variables created in a batch.
    Return,
    /// General query.
    Query,
}

impl StatementType {
    /// Whether the clause opens with a `MATCH` and therefore needs the
    /// variable stack re-projected with `WITH` when it follows a write.
    fn opens_with_match(self) -> bool {
        matches!(
            self,
            StatementType::UpdateNode
                | StatementType::UpdateRelationship
                | StatementType::DeleteRelationship
                | StatementType::DeleteNode
        )
    }
}

/// A single Cypher statement (or clause of a batch) with optional parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CypherStatement {
    /// The Cypher query text.
    pub query: String,
    /// Parameters for the query.
    pub parameters: BTreeMap<String, CypherValue>,
    /// Type of statement.
    pub statement_type: StatementType,
    /// Variables this clause binds for later clauses in the same batch.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Optional comment describing the statement.
    pub comment: Option<String>,
}

impl CypherStatement {
    /// Create a new Cypher statement.
    pub fn new(query: impl Into<String>, statement_type: StatementType) -> Self {
        Self {
            query: query.into(),
            parameters: BTreeMap::new(),
            statement_type,
            variables: Vec::new(),
            comment: None,
        }
    }

    /// Create a node insert clause.
    pub fn create_node(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::CreateNode)
    }

    /// Create a node update clause.
    pub fn update_node(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::UpdateNode)
    }

    /// Create a relationship creation clause.
    pub fn create_relationship(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::CreateRelationship)
    }

    /// Create a relationship update clause.
    pub fn update_relationship(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::UpdateRelationship)
    }

    /// Create a relationship removal clause.
    pub fn delete_relationship(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::DeleteRelationship)
    }

    /// Create a general query statement.
    pub fn query(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::Query)
    }

    /// Add a parameter to this statement.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<CypherValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Add multiple parameters to this statement.
    pub fn with_params(mut self, params: impl IntoIterator<Item = (String, CypherValue)>) -> Self {
        self.parameters.extend(params);
        self
    }

    /// Record a variable bound by this clause.
    pub fn binds(mut self, variable: impl Into<String>) -> Self {
        self.variables.push(variable.into());
        self
    }

    /// Add a comment to this statement.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Check if this statement has parameters.
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// Render this statement as a string with embedded values.
    ///
    /// This inlines parameter values directly into the query. Use this when
    /// you can't use parameterized queries.
    pub fn render_inline(&self) -> String {
        // longest names first so `$n1_props` never clobbers `$n11_props`
        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let mut result = self.query.clone();
        for name in names {
            let placeholder = format!("${}", name);
            result = result.replace(&placeholder, &self.parameters[name].to_cypher_literal());
        }
        result
    }

    /// Format this statement with optional comment prefix.
    ///
    /// This inlines all parameters so the result is directly executable.
    pub fn format(&self, include_comment: bool) -> String {
        let mut lines = Vec::new();

        if include_comment {
            if let Some(comment) = &self.comment {
                lines.push(format!("// {}", comment));
            }
        }

        lines.push(format!("{};", self.render_inline()));

        lines.join("\n")
    }
}

/// An ordered batch of clauses produced by one compilation.
///
/// Node inserts come first, then node updates, relationship creates,
/// relationship updates and finally relationship removals, so every clause
/// only refers to variables bound by an earlier one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementBatch {
    /// The clauses in execution order.
    pub statements: Vec<CypherStatement>,
}

impl StatementBatch {
    /// Create a new empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause to the batch.
    pub fn add(&mut self, statement: CypherStatement) {
        self.statements.push(statement);
    }

    /// Add multiple clauses to the batch.
    pub fn extend(&mut self, statements: impl IntoIterator<Item = CypherStatement>) {
        self.statements.extend(statements);
    }

    /// Get all clauses of a specific type.
    pub fn statements_of_type(&self, statement_type: StatementType) -> Vec<&CypherStatement> {
        self.statements
            .iter()
            .filter(|s| s.statement_type == statement_type)
            .collect()
    }

    /// Count clauses of a specific type.
    pub fn count(&self, statement_type: StatementType) -> usize {
        self.statements
            .iter()
            .filter(|s| s.statement_type == statement_type)
            .count()
    }

    /// Combine every clause into one parameterised statement.
    ///
    /// Variables bound by earlier clauses are carried across each `MATCH`
    /// with a `WITH` projection so the database resolves them within a
    /// single execution context.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::DuplicateParameter`] if two clauses bind the
    /// same parameter name.
    pub fn combined(&self) -> Result<CypherStatement> {
        let mut lines: Vec<String> = Vec::with_capacity(self.statements.len());
        let mut parameters = BTreeMap::new();
        let mut stack: Vec<String> = Vec::new();

        for stmt in &self.statements {
            if stmt.statement_type.opens_with_match() && !stack.is_empty() {
                lines.push(format!("WITH {}", stack.join(", ")));
            }
            lines.push(stmt.query.clone());
            for (name, value) in &stmt.parameters {
                if parameters.insert(name.clone(), value.clone()).is_some() {
                    return Err(MappingError::DuplicateParameter(name.clone()));
                }
            }
            for var in &stmt.variables {
                if !stack.contains(var) {
                    stack.push(var.clone());
                }
            }
        }

        Ok(CypherStatement {
            query: lines.join("\n"),
            parameters,
            statement_type: StatementType::Query,
            variables: stack,
            comment: None,
        })
    }

    /// Render the batch as inline Cypher, one clause per line.
    pub fn render(&self, include_comments: bool) -> String {
        self.statements
            .iter()
            .map(|s| {
                let mut out = String::new();
                if include_comments {
                    if let Some(comment) = &s.comment {
                        out.push_str("// ");
                        out.push_str(comment);
                        out.push('\n');
                    }
                }
                out.push_str(&s.render_inline());
                out
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get the number of clauses.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl IntoIterator for StatementBatch {
    type Item = CypherStatement;
    type IntoIter = std::vec::IntoIter<CypherStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

impl<'a> IntoIterator for &'a StatementBatch {
    type Item = &'a CypherStatement;
    type IntoIter = std::slice::Iter<'a, CypherStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cypher_value_literals() {
        assert_eq!(CypherValue::Null.to_cypher_literal(), "null");
        assert_eq!(CypherValue::Bool(true).to_cypher_literal(), "true");
        assert_eq!(CypherValue::Int(42).to_cypher_literal(), "42");
        assert_eq!(CypherValue::Float(3.0).to_cypher_literal(), "3.0");
        assert_eq!(
            CypherValue::String("it's".to_string()).to_cypher_literal(),
            "'it\\'s'"
        );
    }

    #[test]
    fn test_cypher_value_map() {
        let mut map = BTreeMap::new();
        map.insert("title".to_string(), CypherValue::from("A"));
        map.insert("rank".to_string(), CypherValue::Int(1));
        assert_eq!(
            CypherValue::Map(map).to_cypher_literal(),
            "{rank: 1, title: 'A'}"
        );
    }

    #[test]
    fn test_cypher_value_accessors() {
        assert!(CypherValue::Null.is_null());
        assert_eq!(CypherValue::from("x").as_str(), Some("x"));
        assert_eq!(CypherValue::Int(3).as_float(), Some(3.0));
        assert_eq!(CypherValue::Bool(true).as_bool(), Some(true));
        assert_eq!(CypherValue::from(None::<i64>), CypherValue::Null);
        assert_eq!(CypherValue::List(vec![]).kind(), "list");
    }

    #[test]
    fn test_render_inline_prefers_longest_names() {
        let stmt = CypherStatement::query("RETURN $n1_id, $n11_id")
            .with_param("n1_id", 1i64)
            .with_param("n11_id", 11i64);
        assert_eq!(stmt.render_inline(), "RETURN 1, 11");
    }

    #[test]
    fn test_combined_inserts_with_before_match() {
        let mut batch = StatementBatch::new();
        batch.add(
            CypherStatement::create_node("CREATE (n0:Post $n0_props)")
                .with_param("n0_props", CypherValue::Map(BTreeMap::new()))
                .binds("n0"),
        );
        batch.add(
            CypherStatement::update_node("MATCH (n1) WHERE id(n1) = $n1_id SET n1 += $n1_props")
                .with_param("n1_id", 7i64)
                .with_param("n1_props", CypherValue::Map(BTreeMap::new()))
                .binds("n1"),
        );
        batch.add(CypherStatement::create_relationship("CREATE (n0)-[r0:NEXT]->(n1)").binds("r0"));

        let combined = batch.combined().unwrap();
        let lines: Vec<&str> = combined.query.lines().collect();
        assert_eq!(lines[0], "CREATE (n0:Post $n0_props)");
        assert_eq!(lines[1], "WITH n0");
        assert!(lines[2].starts_with("MATCH (n1)"));
        assert_eq!(lines[3], "CREATE (n0)-[r0:NEXT]->(n1)");
        assert_eq!(combined.parameters.len(), 3);
        assert_eq!(combined.variables, vec!["n0", "n1", "r0"]);
    }

    #[test]
    fn test_combined_rejects_duplicate_parameters() {
        let mut batch = StatementBatch::new();
        batch.add(CypherStatement::create_node("CREATE (n0 $p)").with_param("p", 1i64));
        batch.add(CypherStatement::create_node("CREATE (n1 $p)").with_param("p", 2i64));
        assert!(matches!(
            batch.combined(),
            Err(MappingError::DuplicateParameter(name)) if name == "p"
        ));
    }

    #[test]
    fn test_batch_counts_and_render() {
        let mut batch = StatementBatch::new();
        assert!(batch.is_empty());
        batch.add(CypherStatement::create_node("CREATE (n0:User)").with_comment("new User"));
        batch.add(CypherStatement::create_node("CREATE (n1:User)"));
        assert_eq!(batch.count(StatementType::CreateNode), 2);
        assert_eq!(batch.statements_of_type(StatementType::UpdateNode).len(), 0);

        let rendered = batch.render(true);
        assert!(rendered.contains("// new User"));
        assert!(rendered.contains("CREATE (n1:User)"));
    }
}

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

//! Query results as handed back by the request layer.
//!
//! Graph-shaped results use the same field names as the Neo4j transactional
//! HTTP `graph` format, so they can be deserialized directly.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::cypher::CypherValue;

/// A node in a graph-shaped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    /// Database id.
    pub id: i64,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Properties.
    #[serde(default)]
    pub properties: BTreeMap<String, CypherValue>,
}

impl NodeModel {
    /// Create a node without properties.
    pub fn new<I, S>(id: i64, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            labels: labels.into_iter().map(Into::into).collect(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<CypherValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A relationship in a graph-shaped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipModel {
    /// Database id.
    pub id: i64,
    /// Relationship type.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Id of the start node.
    pub start_node: i64,
    /// Id of the end node.
    pub end_node: i64,
    /// Properties.
    #[serde(default)]
    pub properties: BTreeMap<String, CypherValue>,
}

impl RelationshipModel {
    /// Create a relationship without properties.
    pub fn new(id: i64, rel_type: impl Into<String>, start_node: i64, end_node: i64) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            start_node,
            end_node,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<CypherValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One graph-shaped result: a set of nodes and the edges between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    /// Nodes.
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    /// Relationships.
    #[serde(default)]
    pub relationships: Vec<RelationshipModel>,
}

impl GraphModel {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn with_node(mut self, node: NodeModel) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, rel: RelationshipModel) -> Self {
        self.relationships.push(rel);
        self
    }

    /// Look up a node by id.
    pub fn node(&self, id: i64) -> Option<&NodeModel> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// One cell of a row-shaped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowValue {
    /// A plain value.
    Scalar(CypherValue),
    /// A node.
    Node(NodeModel),
    /// A relationship.
    Relationship(RelationshipModel),
    /// A path, flattened to its nodes and relationships.
    Path(GraphModel),
}

/// One row of a row-shaped result, aligned with the response's columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowModel {
    /// Cell values.
    pub values: Vec<RowValue>,
}

impl RowModel {
    /// Create a row.
    pub fn new(values: Vec<RowValue>) -> Self {
        Self { values }
    }

    /// Cell at a column position.
    pub fn get(&self, index: usize) -> Option<&RowValue> {
        self.values.get(index)
    }
}

/// Update counters reported for a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryStatistics {
    /// Whether anything changed.
    pub contains_updates: bool,
    /// Nodes created.
    pub nodes_created: u64,
    /// Nodes deleted.
    pub nodes_deleted: u64,
    /// Relationships created.
    pub relationships_created: u64,
    /// Relationships deleted.
    pub relationships_deleted: u64,
    /// Properties set.
    pub properties_set: u64,
}

/// A stream of results from one executed statement.
pub trait Response<T> {
    /// Next result, or `None` when exhausted.
    fn next(&mut self) -> Option<T>;

    /// Column names, for row-shaped results.
    fn columns(&self) -> &[String];

    /// Release the underlying result.
    fn close(&mut self);
}

/// A fully materialised [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub struct VecResponse<T> {
    columns: Vec<String>,
    items: VecDeque<T>,
    closed: bool,
}

impl<T> VecResponse<T> {
    /// Create a response over `items`.
    pub fn new(columns: Vec<String>, items: Vec<T>) -> Self {
        Self {
            columns,
            items: items.into(),
            closed: false,
        }
    }

    /// Create a response with no columns.
    pub fn from_items(items: Vec<T>) -> Self {
        Self::new(Vec::new(), items)
    }

    /// Whether [`Response::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T> Response<T> for VecResponse<T> {
    fn next(&mut self) -> Option<T> {
        if self.closed {
            return None;
        }
        self.items.pop_front()
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn close(&mut self) {
        self.closed = true;
        self.items.clear();
    }
}

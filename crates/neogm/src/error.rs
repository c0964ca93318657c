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

//! Error types for object-graph mapping operations.

use std::fmt;
use thiserror::Error;

/// Error type for mapping, compilation and session operations.
///
/// Every variant is fatal for the operation that raised it. Recoverable
/// per-field conversion problems are reported as [`ConversionWarning`]s
/// instead.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A type name is not registered in the metadata index.
    #[error("unknown entity type '{0}'")]
    UnknownType(String),

    /// No registered type matches a node's label set.
    #[error("no entity type matches labels [{}]", .0.join(", "))]
    UnknownLabels(Vec<String>),

    /// More than one identity field was declared for a type.
    #[error("type '{type_name}' declares more than one identity field: {fields:?}")]
    AmbiguousIdentity {
        /// The offending type.
        type_name: String,
        /// All fields claiming to be the identity.
        fields: Vec<String>,
    },

    /// The metadata index is internally inconsistent.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// A relationship endpoint does not match the declared endpoint type.
    #[error("relationship '{rel_type}' expects {expected} at its {side} but found {found}")]
    EndpointTypeMismatch {
        /// The relationship type.
        rel_type: String,
        /// `start` or `end`.
        side: &'static str,
        /// The declared type.
        expected: String,
        /// The type actually present.
        found: String,
    },

    /// A relationship entity is missing its start or end node.
    #[error("relationship entity '{type_name}' has no {side} node")]
    MissingEndpoint {
        /// The relationship entity type.
        type_name: String,
        /// `start` or `end`.
        side: &'static str,
    },

    /// A response edge refers to a node that was neither in the response
    /// nor previously registered.
    #[error("relationship {rel_id} refers to node {node_id} which is not part of the response")]
    UnresolvedEndpoint {
        /// Database id of the relationship.
        rel_id: i64,
        /// Database id of the missing node.
        node_id: i64,
    },

    /// A single-valued relationship field would need more than one edge.
    #[error("field '{field}' on '{type_name}' holds a single relationship but {count} edges are required")]
    CardinalityViolation {
        /// The owning type.
        type_name: String,
        /// The relationship field.
        field: String,
        /// Number of edges the object graph implies.
        count: usize,
    },

    /// An entity handle no longer resolves in the entity graph.
    #[error("stale entity reference {0}")]
    StaleReference(String),

    /// Invalid Cypher identifier.
    #[error("invalid Cypher identifier: '{0}'")]
    InvalidIdentifier(String),

    /// String length limit exceeded.
    #[error("String length {length} exceeds maximum allowed length {max_length} for property '{property}'")]
    StringLengthExceeded {
        /// Actual length of the string.
        length: usize,
        /// Maximum allowed length.
        max_length: usize,
        /// Property name where the violation occurred.
        property: String,
    },

    /// Node count limit exceeded.
    #[error("Node count {count} exceeds maximum allowed count {max_count}")]
    NodeCountExceeded {
        /// Number of nodes visited.
        count: usize,
        /// Maximum allowed nodes.
        max_count: usize,
    },

    /// Two clauses in one batch tried to bind the same parameter name.
    #[error("parameter '{0}' is bound twice in one statement")]
    DuplicateParameter(String),

    /// Serialization error from serde_json.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request layer failed to execute a statement.
    #[error("driver error: {0}")]
    Driver(String),
}

/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;

/// A recoverable failure to convert one field of one entity.
///
/// The field keeps its default (unset) value and processing continues.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionWarning {
    /// The entity type being converted.
    pub type_name: String,
    /// Database id of the entity, if it has one.
    pub entity_id: Option<i64>,
    /// The field that failed to convert.
    pub field: String,
    /// Converter message.
    pub message: String,
}

impl ConversionWarning {
    /// Create a new warning.
    pub fn new(
        type_name: impl Into<String>,
        entity_id: Option<i64>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            entity_id,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity_id {
            Some(id) => write!(
                f,
                "{}({}).{}: {}",
                self.type_name, id, self.field, self.message
            ),
            None => write!(f, "{}.{}: {}", self.type_name, self.field, self.message),
        }
    }
}

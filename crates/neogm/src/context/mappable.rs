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

//! Relationship facts as last known to be persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One directed edge as the database last reported it.
///
/// `relationship_id` is present for every edge read from a response and for
/// new edges whose id was returned on save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mappable {
    /// Database id of the start node.
    pub start_id: i64,
    /// Database id of the end node.
    pub end_id: i64,
    /// Relationship type.
    pub rel_type: String,
    /// Type of the start entity.
    pub start_type: String,
    /// Type of the end entity.
    pub end_type: String,
    /// Database id of the relationship itself.
    pub relationship_id: Option<i64>,
}

impl Mappable {
    /// Create a fact without a relationship id.
    pub fn new(
        start_id: i64,
        end_id: i64,
        rel_type: impl Into<String>,
        start_type: impl Into<String>,
        end_type: impl Into<String>,
    ) -> Self {
        Self {
            start_id,
            end_id,
            rel_type: rel_type.into(),
            start_type: start_type.into(),
            end_type: end_type.into(),
            relationship_id: None,
        }
    }

    /// Attach the relationship's own database id.
    pub fn with_relationship_id(mut self, id: i64) -> Self {
        self.relationship_id = Some(id);
        self
    }

    /// Whether this fact is the edge `pattern` describes.
    ///
    /// A pattern without a relationship id matches on the endpoints, type
    /// and endpoint types alone.
    pub fn matches(&self, pattern: &Mappable) -> bool {
        if pattern.relationship_id.is_some() && pattern.relationship_id != self.relationship_id {
            return false;
        }
        self.start_id == pattern.start_id
            && self.end_id == pattern.end_id
            && self.rel_type == pattern.rel_type
            && self.start_type == pattern.start_type
            && self.end_type == pattern.end_type
    }

    /// Whether either endpoint is `node_id`.
    pub fn touches(&self, node_id: i64) -> bool {
        self.start_id == node_id || self.end_id == node_id
    }

    /// The endpoint opposite `node_id`.
    pub fn other_end(&self, node_id: i64) -> i64 {
        if self.start_id == node_id {
            self.end_id
        } else {
            self.start_id
        }
    }

    /// Endpoints ordered `(min, max)`, the key for undirected comparison.
    pub fn undirected_key(&self) -> (i64, i64) {
        if self.start_id <= self.end_id {
            (self.start_id, self.end_id)
        } else {
            (self.end_id, self.start_id)
        }
    }
}

impl fmt::Display for Mappable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{})-[:{}]->({}:{})",
            self.start_id, self.start_type, self.rel_type, self.end_id, self.end_type
        )?;
        if let Some(id) = self.relationship_id {
            write!(f, " #{}", id)?;
        }
        Ok(())
    }
}

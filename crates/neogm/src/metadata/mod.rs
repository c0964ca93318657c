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

//! The metadata index: an immutable description of every mapped type.
//!
//! Types are declared once with [`ClassInfo`] and resolved by
//! [`MetaDataBuilder::build`], which flattens inheritance (labels, fields,
//! relationship fields, identity and post-load hook) and validates every
//! cross-reference. The resulting [`MetaData`] is read-only and meant to be
//! shared behind an `Arc` by every session.
//!
//! # Examples
//!
//! ```
//! use neogm::metadata::{ClassInfo, MetaData, RelationshipInfo};
//!
//! let meta = MetaData::builder()
//!     .class(ClassInfo::node("Person").abstract_type().property("name"))
//!     .class(ClassInfo::node("Teacher").extends("Person"))
//!     .class(ClassInfo::node("Movie").property("title"))
//!     .class(ClassInfo::node("Actor").property("name")
//!         .relationship(RelationshipInfo::many("movies", "Movie").with_type("ACTS_IN")))
//!     .build()
//!     .unwrap();
//!
//! let teacher = meta.resolve_labels(&["Person", "Teacher"]).unwrap();
//! assert_eq!(teacher.name, "Teacher");
//! assert!(teacher.field_info("name").is_some());
//! ```

mod class_info;
mod convert;

pub use class_info::{ClassInfo, FieldInfo, PostLoadHook, RelationshipInfo};
pub use convert::{AttributeConverter, ConversionError, EnumConverter, JsonStringConverter};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::cypher::validate_identifier;
use crate::error::{MappingError, Result};

/// Direction of a relationship field relative to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Owner is the start node.
    Outgoing,
    /// Owner is the end node.
    Incoming,
    /// Either end; created without an arrowhead.
    Undirected,
}

/// Whether a relationship field holds one or many objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one related object.
    One,
    /// Any number of related objects.
    Many,
}

/// What a mapped type is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// A node.
    Node,
    /// A relationship carrying its own properties.
    RelationshipEntity {
        /// Relationship type in the graph.
        rel_type: String,
        /// Declared type of the start node.
        start_type: String,
        /// Declared type of the end node.
        end_type: String,
    },
}

/// Immutable, resolved metadata for a domain.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    classes: BTreeMap<String, ClassInfo>,
}

impl MetaData {
    /// Start declaring a domain.
    pub fn builder() -> MetaDataBuilder {
        MetaDataBuilder::new()
    }

    /// Look up a type by name.
    pub fn class_info(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Look up a type by name, failing with `UnknownType`.
    pub fn require(&self, name: &str) -> Result<&ClassInfo> {
        self.classes
            .get(name)
            .ok_or_else(|| MappingError::UnknownType(name.to_string()))
    }

    /// All types, ordered by name.
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no types are declared.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Whether `sub` is `sup` or inherits from it.
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        let mut current = Some(sub);
        let mut hops = 0;
        while let Some(name) = current {
            if name == sup {
                return true;
            }
            hops += 1;
            if hops > self.classes.len() {
                return false;
            }
            current = self
                .classes
                .get(name)
                .and_then(|c| c.supertype.as_deref());
        }
        false
    }

    /// The type itself and everything inheriting from it.
    pub fn subtypes_of(&self, name: &str) -> Vec<&ClassInfo> {
        self.classes
            .values()
            .filter(|c| self.is_assignable(&c.name, name))
            .collect()
    }

    /// Resolve the concrete node type for a label set.
    ///
    /// The candidates are the non-abstract node types whose full label set
    /// is contained in `labels`; the one with the most labels wins.
    pub fn resolve_labels<S: AsRef<str>>(&self, labels: &[S]) -> Option<&ClassInfo> {
        let present: BTreeSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        self.classes
            .values()
            .filter(|c| !c.is_abstract && !c.is_relationship_entity() && !c.labels.is_empty())
            .filter(|c| c.labels.iter().all(|l| present.contains(l.as_str())))
            .max_by(|a, b| {
                a.labels
                    .len()
                    .cmp(&b.labels.len())
                    .then_with(|| b.name.cmp(&a.name))
            })
    }

    /// Find the relationship entity type for an edge between two node types.
    pub fn relationship_entity_for(
        &self,
        rel_type: &str,
        start_type: &str,
        end_type: &str,
    ) -> Option<&ClassInfo> {
        self.classes.values().find(|c| match &c.kind {
            EntityKind::RelationshipEntity {
                rel_type: t,
                start_type: s,
                end_type: e,
            } => {
                !c.is_abstract
                    && t == rel_type
                    && self.is_assignable(start_type, s)
                    && self.is_assignable(end_type, e)
            }
            EntityKind::Node => false,
        })
    }
}

/// Collects [`ClassInfo`] declarations and resolves them into [`MetaData`].
#[derive(Debug, Default)]
pub struct MetaDataBuilder {
    declared: Vec<ClassInfo>,
}

impl MetaDataBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type.
    pub fn class(mut self, info: ClassInfo) -> Self {
        self.declared.push(info);
        self
    }

    /// Resolve inheritance and validate the domain.
    ///
    /// # Errors
    ///
    /// - `InvalidMetadata` for duplicate names, inheritance cycles, a
    ///   relationship field whose type disagrees with its relationship
    ///   entity, or a relationship entity endpoint that is not a node type
    /// - `UnknownType` for a missing supertype, relationship target or
    ///   relationship entity endpoint
    /// - `AmbiguousIdentity` when a type ends up with two identity fields
    /// - `InvalidIdentifier` for a label or relationship type that is not a
    ///   plain Cypher identifier
    pub fn build(self) -> Result<MetaData> {
        let mut declared: BTreeMap<String, ClassInfo> = BTreeMap::new();
        for info in self.declared {
            if declared.contains_key(&info.name) {
                return Err(MappingError::InvalidMetadata(format!(
                    "type '{}' declared twice",
                    info.name
                )));
            }
            declared.insert(info.name.clone(), info);
        }

        let mut classes = BTreeMap::new();
        for name in declared.keys() {
            let resolved = resolve(&declared, name)?;
            classes.insert(name.clone(), resolved);
        }

        let meta = MetaData { classes };
        validate(&meta)?;
        debug!(types = meta.len(), "metadata index built");
        Ok(meta)
    }
}

/// Ancestors of `name`, root first, ending with `name` itself.
fn lineage<'a>(declared: &'a BTreeMap<String, ClassInfo>, name: &str) -> Result<Vec<&'a ClassInfo>> {
    let mut chain = Vec::new();
    let mut current = Some(name.to_string());
    while let Some(n) = current {
        let info = declared
            .get(&n)
            .ok_or_else(|| MappingError::UnknownType(n.clone()))?;
        if chain.iter().any(|c: &&ClassInfo| c.name == info.name) {
            return Err(MappingError::InvalidMetadata(format!(
                "inheritance cycle through '{}'",
                info.name
            )));
        }
        chain.push(info);
        current = info.supertype.clone();
    }
    chain.reverse();
    Ok(chain)
}

fn resolve(declared: &BTreeMap<String, ClassInfo>, name: &str) -> Result<ClassInfo> {
    let chain = lineage(declared, name)?;
    let own = chain[chain.len() - 1];

    let mut labels: Vec<String> = Vec::new();
    let mut fields: Vec<FieldInfo> = Vec::new();
    let mut relationships: Vec<RelationshipInfo> = Vec::new();
    let mut ids: Vec<String> = Vec::new();
    let mut post_load = None;

    for info in &chain {
        for label in &info.labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        for field in &info.fields {
            fields.retain(|f| f.name != field.name);
            fields.push(field.clone());
        }
        for rel in &info.relationships {
            relationships.retain(|r| r.field != rel.field);
            relationships.push(rel.clone());
        }
        for id in &info.declared_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        if info.post_load.is_some() {
            post_load = info.post_load.clone();
        }
    }

    if ids.len() > 1 {
        return Err(MappingError::AmbiguousIdentity {
            type_name: own.name.clone(),
            fields: ids,
        });
    }

    Ok(ClassInfo {
        labels,
        fields,
        relationships,
        id_field: ids.pop(),
        post_load,
        ..own.clone()
    })
}

fn validate(meta: &MetaData) -> Result<()> {
    for class in meta.classes() {
        for label in &class.labels {
            validate_identifier(label)?;
        }
        if let Some(rel_type) = class.rel_type() {
            validate_identifier(rel_type)?;
        }
        for rel in &class.relationships {
            validate_identifier(&rel.rel_type)?;
            let target = meta.require(&rel.target_type)?;
            if let Some(target_rel) = target.rel_type() {
                if target_rel != rel.rel_type {
                    return Err(MappingError::InvalidMetadata(format!(
                        "field '{}.{}' is typed '{}' but relationship entity '{}' is '{}'",
                        class.name, rel.field, rel.rel_type, target.name, target_rel
                    )));
                }
            }
        }
        if let EntityKind::RelationshipEntity {
            start_type,
            end_type,
            ..
        } = &class.kind
        {
            for endpoint in [start_type, end_type] {
                if meta.require(endpoint)?.is_relationship_entity() {
                    return Err(MappingError::InvalidMetadata(format!(
                        "relationship entity '{}' cannot connect relationship entity '{}'",
                        class.name, endpoint
                    )));
                }
            }
        }
    }
    Ok(())
}

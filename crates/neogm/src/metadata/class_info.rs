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

//! Per-type descriptors: properties, relationship fields and hooks.

use std::fmt;
use std::sync::Arc;

use super::convert::AttributeConverter;
use super::{Cardinality, Direction, EntityKind};
use crate::cypher::to_relationship_type;
use crate::graph::{EntityGraph, EntityRef};

/// Callback run after an entity has been fully hydrated from a response.
#[derive(Clone)]
pub struct PostLoadHook(Arc<dyn Fn(&mut EntityGraph, EntityRef) + Send + Sync>);

impl PostLoadHook {
    /// Wrap a callback.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut EntityGraph, EntityRef) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the callback for one entity.
    pub fn call(&self, graph: &mut EntityGraph, entity: EntityRef) {
        (self.0)(graph, entity)
    }
}

impl fmt::Debug for PostLoadHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostLoadHook(..)")
    }
}

/// A persisted scalar field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name on the entity.
    pub name: String,
    /// Property key in the graph.
    pub property: String,
    /// Optional converter applied in both directions.
    pub converter: Option<Arc<dyn AttributeConverter>>,
}

impl FieldInfo {
    /// A field stored under its own name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            property: name.clone(),
            name,
            converter: None,
        }
    }

    /// Store the field under a different property key.
    pub fn stored_as(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Attach a converter.
    pub fn with_converter(mut self, converter: Arc<dyn AttributeConverter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// A relationship-valued field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Field name on the entity.
    pub field: String,
    /// Relationship type in the graph.
    pub rel_type: String,
    /// Direction seen from the owning entity.
    pub direction: Direction,
    /// Declared type of the related object. For a relationship entity
    /// field this is the relationship entity type.
    pub target_type: String,
    /// Whether the field holds one or many related objects.
    pub cardinality: Cardinality,
}

impl RelationshipInfo {
    /// An outgoing relationship typed after the field name
    /// (`actedIn` becomes `ACTED_IN`).
    pub fn new(
        field: impl Into<String>,
        target_type: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        let field = field.into();
        Self {
            rel_type: to_relationship_type(&field),
            field,
            direction: Direction::Outgoing,
            target_type: target_type.into(),
            cardinality,
        }
    }

    /// A single-valued relationship field.
    pub fn one(field: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(field, target_type, Cardinality::One)
    }

    /// A collection-valued relationship field.
    pub fn many(field: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(field, target_type, Cardinality::Many)
    }

    /// Override the relationship type.
    pub fn with_type(mut self, rel_type: impl Into<String>) -> Self {
        self.rel_type = rel_type.into();
        self
    }

    /// Set the direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Mark the field as incoming.
    pub fn incoming(self) -> Self {
        self.direction(Direction::Incoming)
    }

    /// Mark the field as undirected.
    pub fn undirected(self) -> Self {
        self.direction(Direction::Undirected)
    }

    /// Whether an edge leaving the owner is visible through this field.
    pub fn reads_outgoing(&self) -> bool {
        matches!(self.direction, Direction::Outgoing | Direction::Undirected)
    }

    /// Whether an edge arriving at the owner is visible through this field.
    pub fn reads_incoming(&self) -> bool {
        matches!(self.direction, Direction::Incoming | Direction::Undirected)
    }
}

/// Descriptor of one mapped type.
///
/// Declared with the fluent methods below and handed to
/// [`MetaDataBuilder`](super::MetaDataBuilder). After the index is built the
/// `labels`, `fields` and `relationships` include everything inherited from
/// supertypes.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Logical type name.
    pub name: String,
    /// Node labels (for node types).
    pub labels: Vec<String>,
    /// Direct supertype, if any.
    pub supertype: Option<String>,
    /// Abstract types are never instantiated.
    pub is_abstract: bool,
    /// Node or relationship entity.
    pub kind: EntityKind,
    /// Name of the identity attribute used for row mapping.
    pub id_field: Option<String>,
    /// Persisted scalar fields.
    pub fields: Vec<FieldInfo>,
    /// Relationship fields.
    pub relationships: Vec<RelationshipInfo>,
    /// Post-load hook.
    pub post_load: Option<PostLoadHook>,
    pub(crate) declared_ids: Vec<String>,
}

impl ClassInfo {
    fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            supertype: None,
            is_abstract: false,
            kind,
            id_field: None,
            fields: Vec::new(),
            relationships: Vec::new(),
            post_load: None,
            declared_ids: Vec::new(),
        }
    }

    /// A node type labelled with its own name.
    pub fn node(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut info = Self::new(name.clone(), EntityKind::Node);
        info.labels.push(name);
        info
    }

    /// A relationship entity type.
    pub fn relationship_entity(
        name: impl Into<String>,
        rel_type: impl Into<String>,
        start_type: impl Into<String>,
        end_type: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            EntityKind::RelationshipEntity {
                rel_type: rel_type.into(),
                start_type: start_type.into(),
                end_type: end_type.into(),
            },
        )
    }

    /// Replace the declared labels.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a direct supertype.
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    /// Mark the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare the identity attribute.
    pub fn identity(mut self, field: impl Into<String>) -> Self {
        self.declared_ids.push(field.into());
        self
    }

    /// Add a scalar field stored under its own name.
    pub fn property(self, name: impl Into<String>) -> Self {
        self.field(FieldInfo::new(name))
    }

    /// Add a scalar field.
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relationship field.
    pub fn relationship(mut self, info: RelationshipInfo) -> Self {
        self.relationships.push(info);
        self
    }

    /// Add an outgoing single-valued relationship typed after the field.
    pub fn to_one(self, field: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(RelationshipInfo::one(field, target_type))
    }

    /// Add an outgoing collection relationship typed after the field.
    pub fn to_many(self, field: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(RelationshipInfo::many(field, target_type))
    }

    /// Register a post-load hook.
    pub fn on_post_load<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut EntityGraph, EntityRef) + Send + Sync + 'static,
    {
        self.post_load = Some(PostLoadHook::new(f));
        self
    }

    /// Whether this is a relationship entity type.
    pub fn is_relationship_entity(&self) -> bool {
        matches!(self.kind, EntityKind::RelationshipEntity { .. })
    }

    /// Relationship type for relationship entity types.
    pub fn rel_type(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::RelationshipEntity { rel_type, .. } => Some(rel_type),
            EntityKind::Node => None,
        }
    }

    /// Look up a scalar field by entity name.
    pub fn field_info(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a scalar field by graph property key.
    pub fn field_by_property(&self, property: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// Look up a relationship field by name.
    pub fn relationship_info(&self, field: &str) -> Option<&RelationshipInfo> {
        self.relationships.iter().find(|r| r.field == field)
    }

    /// The identity attribute name, `id` when none was declared.
    pub fn id_field_name(&self) -> &str {
        self.id_field.as_deref().unwrap_or("id")
    }
}

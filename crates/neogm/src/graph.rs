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

//! The application-owned object graph.
//!
//! Domain objects live in an [`EntityGraph`] arena and refer to each other
//! through copyable [`EntityRef`] handles. A handle is the object's identity:
//! two handles are equal exactly when they name the same object. Removing an
//! entity leaves a tombstone, so any handle still held elsewhere (for
//! example by a mapping context) simply stops resolving.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cypher::CypherValue;
use crate::error::{MappingError, Result};

/// Handle to an entity in an [`EntityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    index: u32,
    generation: u32,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Contents of a relationship field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipValue {
    /// A single related object.
    Single(EntityRef),
    /// A collection of related objects.
    Many(Vec<EntityRef>),
}

impl RelationshipValue {
    /// The referenced handles.
    pub fn refs(&self) -> &[EntityRef] {
        match self {
            RelationshipValue::Single(r) => std::slice::from_ref(r),
            RelationshipValue::Many(v) => v,
        }
    }

    /// Number of referenced objects.
    pub fn len(&self) -> usize {
        self.refs().len()
    }

    /// Check if nothing is referenced.
    pub fn is_empty(&self) -> bool {
        self.refs().is_empty()
    }
}

/// One domain object: a node or a relationship entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Mapped type name.
    pub type_name: String,
    /// Database id; `None` until first persisted.
    pub id: Option<i64>,
    /// Scalar attributes by field name.
    pub properties: BTreeMap<String, CypherValue>,
    /// Relationship fields by field name. Absent and empty both mean no edges.
    pub relationships: BTreeMap<String, RelationshipValue>,
    /// Start node, for relationship entities.
    pub start: Option<EntityRef>,
    /// End node, for relationship entities.
    pub end: Option<EntityRef>,
}

impl Entity {
    /// A new, unpersisted entity of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            properties: BTreeMap::new(),
            relationships: BTreeMap::new(),
            start: None,
            end: None,
        }
    }

    /// Set the database id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set a scalar attribute.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<CypherValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set both endpoints of a relationship entity.
    pub fn between(mut self, start: EntityRef, end: EntityRef) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Whether the entity has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Read a scalar attribute.
    pub fn property(&self, name: &str) -> Option<&CypherValue> {
        self.properties.get(name)
    }

    /// Set a scalar attribute.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<CypherValue>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Handles held by a relationship field; empty when unset.
    pub fn related(&self, field: &str) -> &[EntityRef] {
        self.relationships
            .get(field)
            .map(RelationshipValue::refs)
            .unwrap_or(&[])
    }

    /// Point a single-valued field at `target`.
    pub fn set_related(&mut self, field: impl Into<String>, target: EntityRef) {
        self.relationships
            .insert(field.into(), RelationshipValue::Single(target));
    }

    /// Add `target` to a collection field unless already present.
    pub fn add_related(&mut self, field: impl Into<String>, target: EntityRef) {
        let slot = self
            .relationships
            .entry(field.into())
            .or_insert_with(|| RelationshipValue::Many(Vec::new()));
        match *slot {
            RelationshipValue::Many(ref mut items) => {
                if !items.contains(&target) {
                    items.push(target);
                }
            }
            RelationshipValue::Single(existing) if existing != target => {
                *slot = RelationshipValue::Many(vec![existing, target]);
            }
            RelationshipValue::Single(_) => {}
        }
    }

    /// Remove `target` from a relationship field.
    pub fn remove_related(&mut self, field: &str, target: EntityRef) {
        let now_empty = match self.relationships.get_mut(field) {
            Some(RelationshipValue::Many(items)) => {
                items.retain(|r| *r != target);
                items.is_empty()
            }
            Some(RelationshipValue::Single(existing)) => *existing == target,
            None => false,
        };
        if now_empty {
            self.relationships.remove(field);
        }
    }

    /// Empty a relationship field.
    pub fn clear_related(&mut self, field: &str) {
        self.relationships.remove(field);
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Arena owning every domain object of one session.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity and return its handle.
    pub fn insert(&mut self, entity: Entity) -> EntityRef {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            return EntityRef {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        EntityRef {
            index,
            generation: 0,
        }
    }

    /// Resolve a handle.
    pub fn get(&self, r: EntityRef) -> Option<&Entity> {
        self.slots
            .get(r.index as usize)
            .filter(|s| s.generation == r.generation)
            .and_then(|s| s.entity.as_ref())
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, r: EntityRef) -> Option<&mut Entity> {
        self.slots
            .get_mut(r.index as usize)
            .filter(|s| s.generation == r.generation)
            .and_then(|s| s.entity.as_mut())
    }

    /// Resolve a handle, failing with `StaleReference`.
    pub fn try_get(&self, r: EntityRef) -> Result<&Entity> {
        self.get(r)
            .ok_or_else(|| MappingError::StaleReference(r.to_string()))
    }

    /// Resolve a handle mutably, failing with `StaleReference`.
    pub fn try_get_mut(&mut self, r: EntityRef) -> Result<&mut Entity> {
        self.get_mut(r)
            .ok_or_else(|| MappingError::StaleReference(r.to_string()))
    }

    /// Whether the handle still resolves.
    pub fn contains(&self, r: EntityRef) -> bool {
        self.get(r).is_some()
    }

    /// Drop an entity. Every outstanding handle to it goes stale.
    pub fn remove(&mut self, r: EntityRef) -> Option<Entity> {
        let slot = self.slots.get_mut(r.index as usize)?;
        if slot.generation != r.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(r.index);
        self.live -= 1;
        Some(entity)
    }

    /// Point `from.field` at `to` (single-valued field).
    pub fn set_related(&mut self, from: EntityRef, field: &str, to: EntityRef) -> Result<()> {
        self.try_get_mut(from)?.set_related(field, to);
        Ok(())
    }

    /// Add `to` to the collection `from.field`.
    pub fn add_related(&mut self, from: EntityRef, field: &str, to: EntityRef) -> Result<()> {
        self.try_get_mut(from)?.add_related(field, to);
        Ok(())
    }

    /// Remove `target` from every relationship field that refers to it.
    pub fn purge_references(&mut self, target: EntityRef) {
        for entity in self.slots.iter_mut().filter_map(|s| s.entity.as_mut()) {
            let fields: Vec<String> = entity
                .relationships
                .iter()
                .filter(|(_, value)| value.refs().contains(&target))
                .map(|(field, _)| field.clone())
                .collect();
            for field in fields {
                entity.remove_related(&field, target);
            }
        }
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the graph holds no live entities.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live entities.
    pub fn iter(&self) -> impl Iterator<Item = (EntityRef, &Entity)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.entity.as_ref().map(|e| {
                (
                    EntityRef {
                        index: i as u32,
                        generation: s.generation,
                    },
                    e,
                )
            })
        })
    }

    /// Find the live entity carrying a database id.
    pub fn find_by_id(&self, type_name: &str, id: i64) -> Option<EntityRef> {
        self.iter()
            .find(|(_, e)| e.id == Some(id) && e.type_name == type_name)
            .map(|(r, _)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(Entity::new("Post").with_property("title", "A"));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get(a).unwrap().property("title"), Some(&CypherValue::from("A")));
        assert!(graph.get(a).unwrap().is_new());
    }

    #[test]
    fn test_removed_handle_goes_stale() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(Entity::new("Post"));
        assert!(graph.remove(a).is_some());
        assert!(!graph.contains(a));
        assert!(graph.remove(a).is_none());

        let b = graph.insert(Entity::new("Post"));
        assert_ne!(a, b);
        assert!(graph.get(a).is_none());
        assert!(matches!(graph.try_get(a), Err(MappingError::StaleReference(_))));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_relationship_fields() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(Entity::new("Actor"));
        let m1 = graph.insert(Entity::new("Movie"));
        let m2 = graph.insert(Entity::new("Movie"));

        graph.add_related(a, "movies", m1).unwrap();
        graph.add_related(a, "movies", m2).unwrap();
        graph.add_related(a, "movies", m1).unwrap();
        assert_eq!(graph.get(a).unwrap().related("movies"), &[m1, m2]);

        graph.get_mut(a).unwrap().remove_related("movies", m1);
        assert_eq!(graph.get(a).unwrap().related("movies"), &[m2]);
        graph.get_mut(a).unwrap().remove_related("movies", m2);
        assert!(graph.get(a).unwrap().relationships.is_empty());
        assert!(graph.get(a).unwrap().related("unknown").is_empty());
    }

    #[test]
    fn test_single_promotes_to_many() {
        let mut entity = Entity::new("Post");
        let mut graph = EntityGraph::new();
        let x = graph.insert(Entity::new("Post"));
        let y = graph.insert(Entity::new("Post"));
        entity.set_related("next", x);
        entity.add_related("next", y);
        assert_eq!(entity.related("next"), &[x, y]);
    }

    #[test]
    fn test_iter_and_find() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(Entity::new("Movie").with_id(9));
        let b = graph.insert(Entity::new("Movie"));
        graph.remove(b);
        let seen: Vec<EntityRef> = graph.iter().map(|(r, _)| r).collect();
        assert_eq!(seen, vec![a]);
        assert_eq!(graph.find_by_id("Movie", 9), Some(a));
        assert_eq!(graph.find_by_id("Actor", 9), None);
    }
}

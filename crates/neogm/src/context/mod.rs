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

//! The mapping context: what this session believes the database holds.
//!
//! The context is an identity map from database ids to entity handles plus
//! a multiset of [`Mappable`] relationship facts, indexed by start and end
//! node. It performs no I/O and never fails; lookups report absence with
//! `None`.
//!
//! Handles stored here do not keep entities alive. Use
//! [`MappingContext::live_node`] to skip entries whose entity was dropped
//! from the [`EntityGraph`].

mod mappable;

pub use mappable::Mappable;

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

use crate::compiler::CompiledBatch;
use crate::error::Result;
use crate::graph::{EntityGraph, EntityRef};
use crate::metadata::MetaData;

/// Tombstones tolerated before the relationship register is compacted.
const COMPACT_MIN_TOMBSTONES: usize = 64;

/// Position of a fact in the context's relationship register.
///
/// Slots are stable only while the context is not mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappableSlot(usize);

#[derive(Debug, Clone)]
struct Registered {
    entity: EntityRef,
    type_name: String,
}

/// Session-scoped identity map and relationship register.
#[derive(Debug, Default)]
pub struct MappingContext {
    nodes: HashMap<i64, Registered>,
    relationship_entities: HashMap<i64, Registered>,
    types: BTreeMap<String, Vec<EntityRef>>,
    relationships: Vec<Option<Mappable>>,
    starting: HashMap<i64, Vec<usize>>,
    ending: HashMap<i64, Vec<usize>>,
    by_relationship_id: HashMap<i64, usize>,
    relationship_count: usize,
}

impl MappingContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Register a node under its database id.
    ///
    /// If the id is already registered the existing handle is returned and
    /// `entity` is discarded; callers must use the returned handle.
    pub fn register_node(&mut self, id: i64, type_name: &str, entity: EntityRef) -> EntityRef {
        if let Some(existing) = self.nodes.get(&id) {
            trace!(id, existing = %existing.entity, "node already registered");
            return existing.entity;
        }
        debug!(id, type_name, entity = %entity, "register node");
        self.nodes.insert(
            id,
            Registered {
                entity,
                type_name: type_name.to_string(),
            },
        );
        self.add_to_type(type_name, entity);
        entity
    }

    /// Look up a node by database id.
    pub fn get_node(&self, id: i64) -> Option<EntityRef> {
        self.nodes.get(&id).map(|r| r.entity)
    }

    /// Look up a node whose entity is still alive in `graph`.
    pub fn live_node(&self, graph: &EntityGraph, id: i64) -> Option<EntityRef> {
        self.get_node(id).filter(|r| graph.contains(*r))
    }

    /// Whether a node id is registered.
    pub fn contains_node(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Type name a node was registered with.
    pub fn node_type(&self, id: i64) -> Option<&str> {
        self.nodes.get(&id).map(|r| r.type_name.as_str())
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Forget a node. Its relationship facts are kept; see
    /// [`detach_node`](Self::detach_node).
    pub fn remove_node(&mut self, id: i64) -> Option<EntityRef> {
        let removed = self.nodes.remove(&id)?;
        debug!(id, "remove node");
        self.remove_from_type(&removed.type_name, removed.entity);
        Some(removed.entity)
    }

    /// Forget a node together with every fact touching it.
    pub fn detach_node(&mut self, id: i64) -> Option<EntityRef> {
        let slots: Vec<usize> = self
            .starting
            .get(&id)
            .into_iter()
            .chain(self.ending.get(&id))
            .flatten()
            .copied()
            .collect();
        for slot in slots {
            if let Some(m) = self.take_slot(slot) {
                if let Some(rel_id) = m.relationship_id {
                    self.remove_relationship_entity(rel_id);
                }
            }
        }
        self.compact();
        self.remove_node(id)
    }

    /// Registered nodes at the other end of any fact touching `id`.
    pub fn neighbours(&self, id: i64) -> Vec<EntityRef> {
        let mut out = Vec::new();
        for m in self.mappings_starting_at(id).chain(self.mappings_ending_at(id)) {
            if let Some(r) = self.get_node(m.other_end(id)) {
                if !out.contains(&r) {
                    out.push(r);
                }
            }
        }
        out
    }

    // ========================================================================
    // Relationship entities
    // ========================================================================

    /// Register a relationship entity under its relationship id.
    ///
    /// Like [`register_node`](Self::register_node), an existing registration
    /// wins.
    pub fn register_relationship_entity(
        &mut self,
        id: i64,
        type_name: &str,
        entity: EntityRef,
    ) -> EntityRef {
        if let Some(existing) = self.relationship_entities.get(&id) {
            return existing.entity;
        }
        debug!(id, type_name, entity = %entity, "register relationship entity");
        self.relationship_entities.insert(
            id,
            Registered {
                entity,
                type_name: type_name.to_string(),
            },
        );
        self.add_to_type(type_name, entity);
        entity
    }

    /// Look up a relationship entity by relationship id.
    pub fn get_relationship_entity(&self, id: i64) -> Option<EntityRef> {
        self.relationship_entities.get(&id).map(|r| r.entity)
    }

    /// Forget a relationship entity.
    pub fn remove_relationship_entity(&mut self, id: i64) -> Option<EntityRef> {
        let removed = self.relationship_entities.remove(&id)?;
        self.remove_from_type(&removed.type_name, removed.entity);
        Some(removed.entity)
    }

    // ========================================================================
    // Type register
    // ========================================================================

    /// Registered entities of `type_name` or any of its subtypes.
    pub fn entities_of_type(&self, meta: &MetaData, type_name: &str) -> Vec<EntityRef> {
        self.types
            .iter()
            .filter(|(t, _)| meta.is_assignable(t, type_name))
            .flat_map(|(_, refs)| refs.iter().copied())
            .collect()
    }

    /// Forget every node and relationship entity of `type_name` or its
    /// subtypes.
    pub fn remove_type(&mut self, meta: &MetaData, type_name: &str) {
        let doomed: Vec<String> = self
            .types
            .keys()
            .filter(|t| meta.is_assignable(t, type_name))
            .cloned()
            .collect();
        for t in &doomed {
            self.types.remove(t);
        }
        self.nodes.retain(|_, r| !doomed.contains(&r.type_name));
        self.relationship_entities
            .retain(|_, r| !doomed.contains(&r.type_name));
        debug!(type_name, purged = doomed.len(), "removed type from context");
    }

    fn add_to_type(&mut self, type_name: &str, entity: EntityRef) {
        let refs = self.types.entry(type_name.to_string()).or_default();
        if !refs.contains(&entity) {
            refs.push(entity);
        }
    }

    fn remove_from_type(&mut self, type_name: &str, entity: EntityRef) {
        if let Some(refs) = self.types.get_mut(type_name) {
            refs.retain(|r| *r != entity);
            if refs.is_empty() {
                self.types.remove(type_name);
            }
        }
    }

    // ========================================================================
    // Relationship facts
    // ========================================================================

    /// Record a relationship fact.
    ///
    /// Facts without a relationship id form a multiset. A fact whose
    /// relationship id is already registered is ignored and `false` is
    /// returned.
    pub fn register_relationship(&mut self, mappable: Mappable) -> bool {
        if let Some(rel_id) = mappable.relationship_id {
            if self.by_relationship_id.contains_key(&rel_id) {
                return false;
            }
        }
        let slot = self.relationships.len();
        trace!(relationship = %mappable, "register relationship");
        self.index_slot(slot, &mappable);
        self.relationships.push(Some(mappable));
        self.relationship_count += 1;
        true
    }

    /// Remove one occurrence of a fact. Returns whether one was found.
    ///
    /// Without a relationship id the first fact with the same endpoints,
    /// type and endpoint types is removed.
    pub fn remove_relationship(&mut self, mappable: &Mappable) -> bool {
        let slot = match mappable.relationship_id {
            Some(rel_id) => self.by_relationship_id.get(&rel_id).copied(),
            None => self.starting.get(&mappable.start_id).and_then(|slots| {
                slots
                    .iter()
                    .copied()
                    .find(|s| {
                        self.relationships[*s]
                            .as_ref()
                            .map_or(false, |m| m.matches(mappable))
                    })
            }),
        };
        let Some(slot) = slot else {
            return false;
        };
        trace!(relationship = %mappable, "remove relationship");
        let removed = self.take_slot(slot).is_some();
        self.compact();
        removed
    }

    fn index_slot(&mut self, slot: usize, mappable: &Mappable) {
        self.starting.entry(mappable.start_id).or_default().push(slot);
        self.ending.entry(mappable.end_id).or_default().push(slot);
        if let Some(rel_id) = mappable.relationship_id {
            self.by_relationship_id.insert(rel_id, slot);
        }
    }

    fn take_slot(&mut self, slot: usize) -> Option<Mappable> {
        let m = self.relationships.get_mut(slot)?.take()?;
        unindex(&mut self.starting, m.start_id, slot);
        unindex(&mut self.ending, m.end_id, slot);
        if let Some(rel_id) = m.relationship_id {
            self.by_relationship_id.remove(&rel_id);
        }
        self.relationship_count -= 1;
        Some(m)
    }

    /// Rebuild the register without tombstones once they make up at least
    /// half of it.
    fn compact(&mut self) {
        let tombstones = self.relationships.len() - self.relationship_count;
        if tombstones < COMPACT_MIN_TOMBSTONES || tombstones * 2 < self.relationships.len() {
            return;
        }
        let live = std::mem::take(&mut self.relationships);
        self.starting.clear();
        self.ending.clear();
        self.by_relationship_id.clear();
        for m in live.into_iter().flatten() {
            let slot = self.relationships.len();
            self.index_slot(slot, &m);
            self.relationships.push(Some(m));
        }
        trace!(tombstones, "compacted relationship register");
    }

    /// Whether a fact matching `mappable` is registered. See
    /// [`Mappable::matches`].
    pub fn contains_relationship(&self, mappable: &Mappable) -> bool {
        self.mappings_starting_at(mappable.start_id)
            .any(|m| m.matches(mappable))
    }

    /// First fact of `rel_type` from `start_id` to `end_id`.
    pub fn find_relationship(&self, start_id: i64, rel_type: &str, end_id: i64) -> Option<&Mappable> {
        self.mappings_starting_at(start_id)
            .find(|m| m.end_id == end_id && m.rel_type == rel_type)
    }

    /// The fact carrying a relationship id.
    pub fn relationship_by_id(&self, rel_id: i64) -> Option<&Mappable> {
        self.by_relationship_id
            .get(&rel_id)
            .and_then(|s| self.relationships[*s].as_ref())
    }

    /// Facts whose start node is `id`.
    pub fn mappings_starting_at(&self, id: i64) -> impl Iterator<Item = &Mappable> {
        self.slots_starting_at(id).map(|(_, m)| m)
    }

    /// Facts whose end node is `id`.
    pub fn mappings_ending_at(&self, id: i64) -> impl Iterator<Item = &Mappable> {
        self.slots_ending_at(id).map(|(_, m)| m)
    }

    /// Facts whose start node is `id`, with their register slot.
    pub fn slots_starting_at(&self, id: i64) -> impl Iterator<Item = (MappableSlot, &Mappable)> {
        self.indexed(self.starting.get(&id))
    }

    /// Facts whose end node is `id`, with their register slot.
    pub fn slots_ending_at(&self, id: i64) -> impl Iterator<Item = (MappableSlot, &Mappable)> {
        self.indexed(self.ending.get(&id))
    }

    fn indexed<'a>(
        &'a self,
        slots: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = (MappableSlot, &'a Mappable)> + 'a {
        slots
            .into_iter()
            .flatten()
            .filter_map(move |s| self.relationships[*s].as_ref().map(|m| (MappableSlot(*s), m)))
    }

    /// Every registered fact.
    pub fn relationships(&self) -> impl Iterator<Item = &Mappable> {
        self.relationships.iter().flatten()
    }

    /// Number of registered facts.
    pub fn relationship_count(&self) -> usize {
        self.relationship_count
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Drop every registration.
    pub fn clear(&mut self) {
        debug!(
            nodes = self.nodes.len(),
            relationships = self.relationship_count,
            "clear mapping context"
        );
        *self = Self::default();
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationship_entities.is_empty() && self.relationship_count == 0
    }

    /// Fold the outcome of an executed batch back into the context.
    ///
    /// `new_ids` maps the variables of new nodes and relationships to the
    /// database ids returned by the save. Ids are written into the new
    /// entities, which are then registered together with their new
    /// relationship facts; facts the batch deleted are removed. A second
    /// compilation of the same graph then creates nothing twice.
    pub fn acknowledge(
        &mut self,
        batch: &CompiledBatch,
        graph: &mut EntityGraph,
        new_ids: &BTreeMap<String, i64>,
    ) -> Result<()> {
        for m in &batch.deleted {
            self.remove_relationship(m);
            if let Some(rel_id) = m.relationship_id {
                self.remove_relationship_entity(rel_id);
            }
        }

        for node in &batch.new_nodes {
            let Some(&id) = new_ids.get(&node.var) else {
                warn!(var = %node.var, "no id returned for new node");
                continue;
            };
            graph.try_get_mut(node.entity)?.id = Some(id);
            self.register_node(id, &node.type_name, node.entity);
        }

        for rel in &batch.new_relationships {
            let start_id = graph.try_get(rel.start)?.id;
            let end_id = graph.try_get(rel.end)?.id;
            let (Some(start_id), Some(end_id)) = (start_id, end_id) else {
                warn!(var = %rel.var, "relationship endpoint still has no id");
                continue;
            };
            let mut mappable = Mappable::new(
                start_id,
                end_id,
                rel.rel_type.clone(),
                rel.start_type.clone(),
                rel.end_type.clone(),
            );
            let rel_id = new_ids.get(&rel.var).copied();
            if let Some(rel_id) = rel_id {
                mappable = mappable.with_relationship_id(rel_id);
            }
            self.register_relationship(mappable);

            if let (Some(entity), Some(rel_id)) = (rel.entity, rel_id) {
                let type_name = graph.try_get(entity)?.type_name.clone();
                graph.try_get_mut(entity)?.id = Some(rel_id);
                self.register_relationship_entity(rel_id, &type_name, entity);
            }
        }

        debug!(
            nodes = batch.new_nodes.len(),
            relationships = batch.new_relationships.len(),
            deleted = batch.deleted.len(),
            "acknowledged batch"
        );
        Ok(())
    }
}

fn unindex(index: &mut HashMap<i64, Vec<usize>>, id: i64, slot: usize) {
    if let Some(slots) = index.get_mut(&id) {
        slots.retain(|s| *s != slot);
        if slots.is_empty() {
            index.remove(&id);
        }
    }
}

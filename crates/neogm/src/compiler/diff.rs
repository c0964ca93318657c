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

//! Relationship diff between the live object graph and the mapping context.
//!
//! Current edges come from the relationship fields of every inspected node
//! and from every visited relationship entity. Known edges are the facts the
//! context holds for those same fields. Current-only edges are created,
//! known-only edges are deleted and edges present on both sides are left
//! alone.

use std::collections::HashSet;
use tracing::{debug, trace};

use super::walk::{concrete_class, endpoints, Walk};
use crate::context::{Mappable, MappableSlot, MappingContext};
use crate::error::{MappingError, Result};
use crate::graph::{EntityGraph, EntityRef};
use crate::metadata::{ClassInfo, Direction, EntityKind, MetaData, RelationshipInfo};

/// An edge of the live object graph.
#[derive(Debug, Clone)]
pub(crate) struct CurrentEdge {
    pub start: EntityRef,
    pub end: EntityRef,
    pub rel_type: String,
    pub undirected: bool,
    pub entity: Option<EntityRef>,
}

/// Property update of a persisted relationship entity.
#[derive(Debug, Clone)]
pub(crate) struct EdgeUpdate {
    pub entity: EntityRef,
    pub rel_id: i64,
}

#[derive(Debug, Default)]
pub(crate) struct EdgePlan {
    pub creates: Vec<CurrentEdge>,
    pub updates: Vec<EdgeUpdate>,
    pub deletes: Vec<Mappable>,
}

type DirectedKey = (i64, String, i64);
type UndirectedKey = (i64, i64, String);

fn undirected_key(a: i64, b: i64, rel_type: &str) -> UndirectedKey {
    if a <= b {
        (a, b, rel_type.to_string())
    } else {
        (b, a, rel_type.to_string())
    }
}

fn is_relationship_entity_fact(context: &MappingContext, m: &Mappable) -> bool {
    m.relationship_id
        .map_or(false, |id| context.get_relationship_entity(id).is_some())
}

/// A plain (non relationship entity) fact between two persisted nodes.
fn find_plain<'c>(
    context: &'c MappingContext,
    start: i64,
    rel_type: &str,
    end: i64,
) -> Option<&'c Mappable> {
    context
        .mappings_starting_at(start)
        .find(|m| m.end_id == end && m.rel_type == rel_type && !is_relationship_entity_fact(context, m))
}

pub(crate) fn plan(
    meta: &MetaData,
    context: &MappingContext,
    graph: &EntityGraph,
    walk: &Walk,
) -> Result<EdgePlan> {
    let current = current_edges(meta, graph, walk)?;

    let mut plan = EdgePlan::default();
    let mut directed: HashSet<DirectedKey> = HashSet::new();
    let mut undirected: HashSet<UndirectedKey> = HashSet::new();
    let mut live_entities: HashSet<i64> = HashSet::new();
    let mut deleted_ids: HashSet<i64> = HashSet::new();

    for edge in current {
        let start_id = graph.try_get(edge.start)?.id;
        let end_id = graph.try_get(edge.end)?.id;

        if let Some(re) = edge.entity {
            let Some(rel_id) = graph.try_get(re)?.id else {
                debug!(rel_type = %edge.rel_type, "context-new relationship entity");
                plan.creates.push(edge);
                continue;
            };
            match context.relationship_by_id(rel_id) {
                Some(known) if Some(known.start_id) != start_id || Some(known.end_id) != end_id => {
                    debug!(rel_id, "relationship entity endpoints changed");
                    deleted_ids.insert(rel_id);
                    plan.deletes.push(known.clone());
                    plan.creates.push(edge);
                }
                _ => {
                    live_entities.insert(rel_id);
                    plan.updates.push(EdgeUpdate { entity: re, rel_id });
                }
            }
            continue;
        }

        if let (Some(s), Some(e)) = (start_id, end_id) {
            let known = if edge.undirected {
                undirected.insert(undirected_key(s, e, &edge.rel_type));
                find_plain(context, s, &edge.rel_type, e)
                    .or_else(|| find_plain(context, e, &edge.rel_type, s))
            } else {
                directed.insert((s, edge.rel_type.clone(), e));
                find_plain(context, s, &edge.rel_type, e)
            };
            if known.is_some() {
                trace!(start = s, end = e, rel_type = %edge.rel_type, "edge unchanged");
                continue;
            }
        }
        debug!(rel_type = %edge.rel_type, "context-new relationship");
        plan.creates.push(edge);
    }

    let mut seen: HashSet<MappableSlot> = HashSet::new();
    for &node in &walk.nodes {
        if !walk.inspected(node) {
            continue;
        }
        let entity = graph.try_get(node)?;
        let Some(id) = entity.id else { continue };
        let class = meta.require(&entity.type_name)?;

        for rel in &class.relationships {
            let target = meta.require(&rel.target_type)?;
            let targets_entity = target.is_relationship_entity();
            let (outgoing_type, incoming_type) = other_end_types(target, rel);

            let mut known: Vec<(MappableSlot, &Mappable)> = Vec::new();
            if rel.reads_outgoing() {
                known.extend(context.slots_starting_at(id).filter(|(_, m)| {
                    m.rel_type == rel.rel_type && meta.is_assignable(&m.end_type, outgoing_type)
                }));
            }
            if rel.reads_incoming() {
                known.extend(context.slots_ending_at(id).filter(|(_, m)| {
                    m.rel_type == rel.rel_type && meta.is_assignable(&m.start_type, incoming_type)
                }));
            }

            for (slot, m) in known {
                if is_relationship_entity_fact(context, m) != targets_entity || !seen.insert(slot) {
                    continue;
                }
                let still_current = match m.relationship_id {
                    Some(rel_id) if targets_entity => {
                        live_entities.contains(&rel_id) || deleted_ids.contains(&rel_id)
                    }
                    _ => {
                        directed.contains(&(m.start_id, m.rel_type.clone(), m.end_id))
                            || undirected.contains(&undirected_key(m.start_id, m.end_id, &m.rel_type))
                    }
                };
                if !still_current {
                    debug!(relationship = %m, "context-del");
                    plan.deletes.push(m.clone());
                }
            }
        }
    }

    Ok(plan)
}

/// Declared type at the far end of an edge read outgoing and incoming.
fn other_end_types<'m>(target: &'m ClassInfo, rel: &'m RelationshipInfo) -> (&'m str, &'m str) {
    match &target.kind {
        EntityKind::RelationshipEntity {
            start_type,
            end_type,
            ..
        } => (end_type.as_str(), start_type.as_str()),
        EntityKind::Node => (rel.target_type.as_str(), rel.target_type.as_str()),
    }
}

fn current_edges(meta: &MetaData, graph: &EntityGraph, walk: &Walk) -> Result<Vec<CurrentEdge>> {
    let mut edges = Vec::new();
    let mut seen_directed: HashSet<(EntityRef, &str, EntityRef)> = HashSet::new();
    let mut seen_undirected: HashSet<(EntityRef, EntityRef, &str)> = HashSet::new();

    for &node in &walk.nodes {
        if !walk.inspected(node) {
            continue;
        }
        let entity = graph.try_get(node)?;
        let class = meta.require(&entity.type_name)?;

        for rel in &class.relationships {
            let target_class = meta.require(&rel.target_type)?;
            for &target in entity.related(&rel.field) {
                if target_class.is_relationship_entity() {
                    check_owner(meta, graph, node, target, rel)?;
                    continue;
                }

                let (start, end) = match rel.direction {
                    Direction::Outgoing | Direction::Undirected => (node, target),
                    Direction::Incoming => (target, node),
                };
                let rel_type = rel.rel_type.as_str();
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                let undirected = rel.direction == Direction::Undirected;

                let duplicate = if undirected {
                    seen_directed.contains(&(start, rel_type, end))
                        || seen_directed.contains(&(end, rel_type, start))
                        || !seen_undirected.insert((lo, hi, rel_type))
                } else {
                    seen_undirected.contains(&(lo, hi, rel_type))
                        || !seen_directed.insert((start, rel_type, end))
                };
                if duplicate {
                    continue;
                }

                edges.push(CurrentEdge {
                    start,
                    end,
                    rel_type: rel.rel_type.clone(),
                    undirected,
                    entity: None,
                });
            }
        }
    }

    for &re in &walk.relationship_entities {
        let entity = graph.try_get(re)?;
        let class = concrete_class(meta, &entity.type_name)?;
        let EntityKind::RelationshipEntity {
            rel_type,
            start_type,
            end_type,
        } = &class.kind
        else {
            continue;
        };
        let (start, end) = endpoints(class, entity)?;
        check_endpoint(meta, graph, rel_type, "start", start, start_type)?;
        check_endpoint(meta, graph, rel_type, "end", end, end_type)?;
        edges.push(CurrentEdge {
            start,
            end,
            rel_type: rel_type.clone(),
            undirected: false,
            entity: Some(re),
        });
    }

    Ok(edges)
}

fn check_endpoint(
    meta: &MetaData,
    graph: &EntityGraph,
    rel_type: &str,
    side: &'static str,
    node: EntityRef,
    expected: &str,
) -> Result<()> {
    let found = &graph.try_get(node)?.type_name;
    if meta.is_assignable(found, expected) {
        Ok(())
    } else {
        Err(MappingError::EndpointTypeMismatch {
            rel_type: rel_type.to_string(),
            side,
            expected: expected.to_string(),
            found: found.clone(),
        })
    }
}

/// A relationship entity held in a field must have the owner at the end the
/// field's direction implies.
fn check_owner(
    meta: &MetaData,
    graph: &EntityGraph,
    owner: EntityRef,
    re: EntityRef,
    rel: &RelationshipInfo,
) -> Result<()> {
    let entity = graph.try_get(re)?;
    let class = meta.require(&entity.type_name)?;
    let (start, end) = endpoints(class, entity)?;
    let (ok, side, other) = match rel.direction {
        Direction::Outgoing => (start == owner, "start", start),
        Direction::Incoming => (end == owner, "end", end),
        Direction::Undirected => (start == owner || end == owner, "start", start),
    };
    if ok {
        return Ok(());
    }
    Err(MappingError::EndpointTypeMismatch {
        rel_type: rel.rel_type.clone(),
        side,
        expected: graph.try_get(owner)?.type_name.clone(),
        found: graph.try_get(other)?.type_name.clone(),
    })
}

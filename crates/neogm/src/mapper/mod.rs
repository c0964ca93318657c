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

//! Graph-to-entity mapper.
//!
//! A graph-shaped response is mapped in two passes. The first instantiates
//! every node the context does not already hold and registers it; the second
//! wires each relationship into the fields of both endpoints, creating
//! relationship entities where the metadata declares one, and records the
//! fact in the context. Because every endpoint exists before any field is
//! set, cycles need no special handling.
//!
//! Nodes that are already registered are reused as they are: their fields
//! are neither overwritten nor re-wired, so a reload never clobbers local
//! changes and always yields the same handle. A registration whose entity
//! was dropped from the graph is detached first, and the node is mapped as
//! if it had never been seen.

mod row;

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace, warn};

use crate::config::MapperConfig;
use crate::context::{Mappable, MappingContext};
use crate::cypher::CypherValue;
use crate::error::{ConversionWarning, MappingError, Result};
use crate::graph::{Entity, EntityGraph, EntityRef};
use crate::metadata::{Cardinality, ClassInfo, MetaData};
use crate::response::{GraphModel, NodeModel, RelationshipModel, Response};

/// Entities produced by one mapping call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingResult {
    /// Entities of the requested type, in response order.
    pub entities: Vec<EntityRef>,
    /// Fields that failed to convert and were left unset.
    pub warnings: Vec<ConversionWarning>,
}

#[derive(Debug, Default)]
struct Hydration {
    touched: Vec<EntityRef>,
    seen: HashSet<EntityRef>,
    warnings: Vec<ConversionWarning>,
}

impl Hydration {
    fn touch(&mut self, r: EntityRef) {
        if self.seen.insert(r) {
            self.touched.push(r);
        }
    }
}

/// Maps query responses into the entity graph.
#[derive(Debug, Clone)]
pub struct GraphMapper<'a> {
    meta: &'a MetaData,
    config: MapperConfig,
}

impl<'a> GraphMapper<'a> {
    /// Create a mapper with the default configuration.
    pub fn new(meta: &'a MetaData) -> Self {
        Self {
            meta,
            config: MapperConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Map every graph in a response and return the entities assignable to
    /// `target_type`.
    ///
    /// # Errors
    ///
    /// - `UnknownType` if `target_type` is not mapped
    /// - `UnknownLabels` for a node with no mapped type when unknown nodes
    ///   are not skipped, or for an edge touching such a node
    /// - `UnresolvedEndpoint` for an edge whose endpoint is neither in the
    ///   response nor registered
    pub fn map<R: Response<GraphModel>>(
        &self,
        target_type: &str,
        response: &mut R,
        context: &mut MappingContext,
        graph: &mut EntityGraph,
    ) -> Result<MappingResult> {
        self.meta.require(target_type)?;
        let mut run = Hydration::default();
        while let Some(model) = response.next() {
            self.map_model(&model, context, graph, &mut run)?;
        }
        response.close();
        Ok(self.finish(target_type, run, graph))
    }

    /// Map a single graph.
    pub fn map_graph(
        &self,
        target_type: &str,
        model: &GraphModel,
        context: &mut MappingContext,
        graph: &mut EntityGraph,
    ) -> Result<MappingResult> {
        self.meta.require(target_type)?;
        let mut run = Hydration::default();
        self.map_model(model, context, graph, &mut run)?;
        Ok(self.finish(target_type, run, graph))
    }

    fn map_model(
        &self,
        model: &GraphModel,
        context: &mut MappingContext,
        graph: &mut EntityGraph,
        run: &mut Hydration,
    ) -> Result<()> {
        let mut skipped: HashMap<i64, &NodeModel> = HashMap::new();

        for node in &model.nodes {
            if let Some(r) = context.live_node(graph, node.id) {
                trace!(id = node.id, "node already mapped");
                run.touch(r);
                continue;
            }
            if context.contains_node(node.id) {
                debug!(id = node.id, "dropping stale registration");
                forget_stale_node(node.id, context, graph);
            }
            let Some(class) = self.meta.resolve_labels(node.labels.as_slice()) else {
                if self.config.skip_unknown_nodes {
                    debug!(id = node.id, labels = ?node.labels, "skipping node with unmapped labels");
                    skipped.insert(node.id, node);
                    continue;
                }
                return Err(MappingError::UnknownLabels(node.labels.clone()));
            };
            let entity = self.hydrate(class, node.id, &node.properties, &mut run.warnings);
            let r = graph.insert(entity);
            let r = context.register_node(node.id, &class.name, r);
            debug!(id = node.id, type_name = %class.name, "mapped node");
            run.touch(r);
        }

        for rel in &model.relationships {
            self.map_relationship(rel, &skipped, context, graph, run)?;
        }
        Ok(())
    }

    fn map_relationship(
        &self,
        rel: &RelationshipModel,
        skipped: &HashMap<i64, &NodeModel>,
        context: &mut MappingContext,
        graph: &mut EntityGraph,
        run: &mut Hydration,
    ) -> Result<()> {
        if context.relationship_by_id(rel.id).is_some() {
            if let Some(re) = context.get_relationship_entity(rel.id) {
                if graph.contains(re) {
                    run.touch(re);
                }
            }
            return Ok(());
        }

        let start = self.endpoint(rel, rel.start_node, skipped, context, graph)?;
        let end = self.endpoint(rel, rel.end_node, skipped, context, graph)?;
        let start_type = graph.try_get(start)?.type_name.clone();
        let end_type = graph.try_get(end)?.type_name.clone();

        match self
            .meta
            .relationship_entity_for(&rel.rel_type, &start_type, &end_type)
        {
            Some(class) => {
                let re = match context
                    .get_relationship_entity(rel.id)
                    .filter(|r| graph.contains(*r))
                {
                    Some(existing) => existing,
                    None => {
                        let entity = self
                            .hydrate(class, rel.id, &rel.properties, &mut run.warnings)
                            .between(start, end);
                        let r = graph.insert(entity);
                        context.register_relationship_entity(rel.id, &class.name, r)
                    }
                };
                self.wire(graph, start, &rel.rel_type, true, re)?;
                self.wire(graph, end, &rel.rel_type, false, re)?;
                run.touch(re);
            }
            None => {
                self.wire(graph, start, &rel.rel_type, true, end)?;
                self.wire(graph, end, &rel.rel_type, false, start)?;
            }
        }

        trace!(rel_id = rel.id, rel_type = %rel.rel_type, "mapped relationship");
        context.register_relationship(
            Mappable::new(rel.start_node, rel.end_node, rel.rel_type.clone(), start_type, end_type)
                .with_relationship_id(rel.id),
        );
        Ok(())
    }

    fn endpoint(
        &self,
        rel: &RelationshipModel,
        node_id: i64,
        skipped: &HashMap<i64, &NodeModel>,
        context: &MappingContext,
        graph: &EntityGraph,
    ) -> Result<EntityRef> {
        if let Some(r) = context.live_node(graph, node_id) {
            return Ok(r);
        }
        match skipped.get(&node_id) {
            Some(node) => Err(MappingError::UnknownLabels(node.labels.clone())),
            None => Err(MappingError::UnresolvedEndpoint {
                rel_id: rel.id,
                node_id,
            }),
        }
    }

    /// Set `other` into the first field of `owner` that sees this edge.
    fn wire(
        &self,
        graph: &mut EntityGraph,
        owner: EntityRef,
        rel_type: &str,
        owner_is_start: bool,
        other: EntityRef,
    ) -> Result<()> {
        let owner_type = graph.try_get(owner)?.type_name.clone();
        let other_type = graph.try_get(other)?.type_name.clone();
        let class = self.meta.require(&owner_type)?;

        let field = class.relationships.iter().find(|info| {
            info.rel_type == rel_type
                && if owner_is_start {
                    info.reads_outgoing()
                } else {
                    info.reads_incoming()
                }
                && self.meta.is_assignable(&other_type, &info.target_type)
        });
        let Some(info) = field else {
            trace!(owner_type = %owner_type, rel_type, "no field for relationship");
            return Ok(());
        };

        let entity = graph.try_get_mut(owner)?;
        match info.cardinality {
            Cardinality::One => entity.set_related(info.field.clone(), other),
            Cardinality::Many => entity.add_related(info.field.clone(), other),
        }
        Ok(())
    }

    /// Build an entity from graph properties, converting each declared field.
    fn hydrate(
        &self,
        class: &ClassInfo,
        id: i64,
        properties: &BTreeMap<String, CypherValue>,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Entity {
        let mut entity = Entity::new(class.name.clone()).with_id(id);
        for field in &class.fields {
            let Some(raw) = properties.get(&field.property) else {
                continue;
            };
            if let Some(value) = self.convert(class, Some(id), field, raw, warnings) {
                entity.properties.insert(field.name.clone(), value);
            }
        }
        entity
    }

    fn convert(
        &self,
        class: &ClassInfo,
        id: Option<i64>,
        field: &crate::metadata::FieldInfo,
        raw: &CypherValue,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Option<CypherValue> {
        let Some(converter) = &field.converter else {
            return Some(raw.clone());
        };
        match converter.to_entity_attribute(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                let warning = ConversionWarning::new(&class.name, id, &field.name, e.to_string());
                warn!(%warning, "attribute conversion failed");
                warnings.push(warning);
                None
            }
        }
    }

    fn finish(&self, target_type: &str, run: Hydration, graph: &mut EntityGraph) -> MappingResult {
        if self.config.run_post_load {
            for &r in &run.touched {
                let hook = graph
                    .get(r)
                    .and_then(|e| self.meta.class_info(&e.type_name))
                    .and_then(|c| c.post_load.clone());
                if let Some(hook) = hook {
                    hook.call(graph, r);
                }
            }
        }

        let entities = run
            .touched
            .iter()
            .copied()
            .filter(|r| {
                graph
                    .get(*r)
                    .map_or(false, |e| self.meta.is_assignable(&e.type_name, target_type))
            })
            .collect();
        MappingResult {
            entities,
            warnings: run.warnings,
        }
    }
}

/// Drop a registration whose entity left the graph, along with its facts
/// and relationship entities, so the response wires the new entity afresh.
fn forget_stale_node(id: i64, context: &mut MappingContext, graph: &mut EntityGraph) {
    let relationship_entities: Vec<EntityRef> = context
        .mappings_starting_at(id)
        .chain(context.mappings_ending_at(id))
        .filter_map(|m| m.relationship_id)
        .filter_map(|rel_id| context.get_relationship_entity(rel_id))
        .collect();
    if let Some(stale) = context.detach_node(id) {
        graph.purge_references(stale);
    }
    for re in relationship_entities {
        graph.purge_references(re);
        graph.remove(re);
    }
}

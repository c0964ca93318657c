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

//! Depth-bounded, identity-guarded traversal of the object graph.

use std::collections::HashMap;
use tracing::trace;

use crate::config::Depth;
use crate::error::{MappingError, Result};
use crate::graph::{EntityGraph, EntityRef};
use crate::metadata::{ClassInfo, Direction, EntityKind, MetaData, RelationshipInfo};

/// Everything reachable from the roots, with the best depth budget each
/// object was reached with.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    pub nodes: Vec<EntityRef>,
    pub relationship_entities: Vec<EntityRef>,
    pub budget: HashMap<EntityRef, Depth>,
}

impl Walk {
    /// Whether a node's relationship fields were inspected.
    pub fn inspected(&self, node: EntityRef) -> bool {
        self.budget.get(&node).map_or(false, |d| !d.is_exhausted())
    }
}

/// Walk from `roots` following relationship fields until `depth` runs out.
///
/// The visited set is keyed by handle, so unpersisted objects and cycles
/// are guarded alike. An object reached again with a larger budget is
/// expanded again; it keeps its original position in visit order.
pub(crate) fn walk(
    meta: &MetaData,
    graph: &EntityGraph,
    roots: &[EntityRef],
    depth: Depth,
    max_nodes: Option<usize>,
) -> Result<Walk> {
    let mut out = Walk::default();
    let mut stack: Vec<(EntityRef, Depth)> = roots.iter().rev().map(|r| (*r, depth)).collect();

    while let Some((r, budget)) = stack.pop() {
        let entity = graph.try_get(r)?;
        let class = concrete_class(meta, &entity.type_name)?;

        match out.budget.get(&r) {
            Some(seen) if *seen >= budget => continue,
            Some(_) => trace!(entity = %r, ?budget, "re-expanding with larger budget"),
            None => {
                if class.is_relationship_entity() {
                    out.relationship_entities.push(r);
                } else {
                    out.nodes.push(r);
                    if let Some(max) = max_nodes {
                        if out.nodes.len() > max {
                            return Err(MappingError::NodeCountExceeded {
                                count: out.nodes.len(),
                                max_count: max,
                            });
                        }
                    }
                }
            }
        }
        out.budget.insert(r, budget);

        if let EntityKind::RelationshipEntity { .. } = class.kind {
            let (start, end) = endpoints(class, entity)?;
            stack.push((end, budget));
            stack.push((start, budget));
            continue;
        }

        if budget.is_exhausted() {
            trace!(entity = %r, "horizon reached");
            continue;
        }

        let next = budget.descend();
        for rel in &class.relationships {
            let targets = entity.related(&rel.field);
            check_cardinality(class, rel, targets.len())?;
            for t in targets.iter().rev() {
                let target = graph.try_get(*t)?;
                check_target(meta, rel, &target.type_name)?;
                stack.push((*t, next));
            }
        }
    }

    Ok(out)
}

/// Resolve a type that may be instantiated and persisted.
pub(crate) fn concrete_class<'m>(meta: &'m MetaData, type_name: &str) -> Result<&'m ClassInfo> {
    let class = meta.require(type_name)?;
    if class.is_abstract {
        return Err(MappingError::InvalidMetadata(format!(
            "abstract type '{}' cannot be persisted",
            type_name
        )));
    }
    Ok(class)
}

/// Start and end handles of a relationship entity.
pub(crate) fn endpoints(
    class: &ClassInfo,
    entity: &crate::graph::Entity,
) -> Result<(EntityRef, EntityRef)> {
    let start = entity.start.ok_or_else(|| MappingError::MissingEndpoint {
        type_name: class.name.clone(),
        side: "start",
    })?;
    let end = entity.end.ok_or_else(|| MappingError::MissingEndpoint {
        type_name: class.name.clone(),
        side: "end",
    })?;
    Ok((start, end))
}

fn check_cardinality(class: &ClassInfo, rel: &RelationshipInfo, count: usize) -> Result<()> {
    if rel.cardinality == crate::metadata::Cardinality::One && count > 1 {
        return Err(MappingError::CardinalityViolation {
            type_name: class.name.clone(),
            field: rel.field.clone(),
            count,
        });
    }
    Ok(())
}

fn check_target(meta: &MetaData, rel: &RelationshipInfo, found: &str) -> Result<()> {
    if meta.is_assignable(found, &rel.target_type) {
        return Ok(());
    }
    Err(MappingError::EndpointTypeMismatch {
        rel_type: rel.rel_type.clone(),
        side: match rel.direction {
            Direction::Incoming => "start",
            Direction::Outgoing | Direction::Undirected => "end",
        },
        expected: rel.target_type.clone(),
        found: found.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Entity;
    use crate::metadata::ClassInfo;

    fn posts() -> MetaData {
        MetaData::builder()
            .class(ClassInfo::node("Post").property("title").to_one("next", "Post"))
            .build()
            .unwrap()
    }

    fn chain(graph: &mut EntityGraph, n: usize) -> Vec<EntityRef> {
        let refs: Vec<EntityRef> = (0..n).map(|_| graph.insert(Entity::new("Post"))).collect();
        for pair in refs.windows(2) {
            graph.set_related(pair[0], "next", pair[1]).unwrap();
        }
        refs
    }

    #[test]
    fn test_depth_bounds_the_walk() {
        let meta = posts();
        let mut graph = EntityGraph::new();
        let refs = chain(&mut graph, 5);

        let w = walk(&meta, &graph, &refs[..1], Depth::Limited(2), None).unwrap();
        assert_eq!(w.nodes, refs[..3].to_vec());
        assert!(w.inspected(refs[1]));
        assert!(!w.inspected(refs[2]));

        let all = walk(&meta, &graph, &refs[..1], Depth::Unlimited, None).unwrap();
        assert_eq!(all.nodes, refs);
    }

    #[test]
    fn test_self_reference_terminates() {
        let meta = posts();
        let mut graph = EntityGraph::new();
        let a = graph.insert(Entity::new("Post"));
        graph.set_related(a, "next", a).unwrap();
        let w = walk(&meta, &graph, &[a], Depth::Unlimited, None).unwrap();
        assert_eq!(w.nodes, vec![a]);
    }

    #[test]
    fn test_revisit_with_larger_budget() {
        let meta = posts();
        let mut graph = EntityGraph::new();
        let refs = chain(&mut graph, 3);
        // second root reaches refs[1] again with a larger budget
        let w = walk(&meta, &graph, &[refs[0], refs[1]], Depth::Limited(1), None).unwrap();
        assert_eq!(w.nodes, refs);
        assert!(w.inspected(refs[1]));
    }

    #[test]
    fn test_node_limit() {
        let meta = posts();
        let mut graph = EntityGraph::new();
        let refs = chain(&mut graph, 4);
        let err = walk(&meta, &graph, &refs[..1], Depth::Unlimited, Some(2)).unwrap_err();
        assert!(matches!(err, MappingError::NodeCountExceeded { count: 3, max_count: 2 }));
    }

    #[test]
    fn test_target_type_checked() {
        let meta = MetaData::builder()
            .class(ClassInfo::node("Post").to_one("next", "Post"))
            .class(ClassInfo::node("Tag"))
            .build()
            .unwrap();
        let mut graph = EntityGraph::new();
        let p = graph.insert(Entity::new("Post"));
        let t = graph.insert(Entity::new("Tag"));
        graph.set_related(p, "next", t).unwrap();
        let err = walk(&meta, &graph, &[p], Depth::Unlimited, None).unwrap_err();
        assert!(matches!(err, MappingError::EndpointTypeMismatch { side: "end", .. }));
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let meta = posts();
        let mut graph = EntityGraph::new();
        let x = graph.insert(Entity::new("Comment"));
        assert!(matches!(
            walk(&meta, &graph, &[x], Depth::Unlimited, None),
            Err(MappingError::UnknownType(_))
        ));
    }
}

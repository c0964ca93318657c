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

//! Entity-to-graph compiler.
//!
//! [`Compiler::compile`] walks an object graph from its roots, decides per
//! node between insert (no id) and match-and-update (has id), diffs the
//! relationship fields it inspected against the [`MappingContext`] and emits
//! an ordered [`StatementBatch`]:
//!
//! 1. `CREATE` for new nodes
//! 2. `MATCH ... SET` for persisted nodes (every declared property)
//! 3. relationship creates, referring to nodes by batch variable
//! 4. relationship entity property updates
//! 5. relationship deletes
//!
//! Compilation is pure. The context is only updated once the caller has
//! executed the batch and passes the returned ids to
//! [`MappingContext::acknowledge`].
//!
//! # Examples
//!
//! ```
//! use neogm::{compile, Depth, Entity, EntityGraph, MappingContext, StatementType};
//! use neogm::metadata::{ClassInfo, MetaData};
//!
//! let meta = MetaData::builder()
//!     .class(ClassInfo::node("Post").property("title").to_one("next", "Post"))
//!     .build()
//!     .unwrap();
//! let mut graph = EntityGraph::new();
//! let a = graph.insert(Entity::new("Post").with_property("title", "A"));
//! let b = graph.insert(Entity::new("Post").with_property("title", "B"));
//! graph.set_related(a, "next", b).unwrap();
//!
//! let batch = compile(&MappingContext::new(), &graph, &meta, &[a], Depth::Unlimited).unwrap();
//! assert_eq!(batch.count(StatementType::CreateNode), 2);
//! assert_eq!(batch.count(StatementType::CreateRelationship), 1);
//! ```

mod diff;
mod walk;

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::config::{CompilerConfig, Depth};
use crate::context::{Mappable, MappingContext};
use crate::cypher::{
    escape_labels, escape_relationship_type, validate_string_length, CypherStatement,
    CypherValue, StatementBatch, StatementType,
};
use crate::error::{ConversionWarning, MappingError, Result};
use crate::graph::{Entity, EntityGraph, EntityRef};
use crate::metadata::{ClassInfo, MetaData};

use walk::concrete_class;

/// A node the batch inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    /// Batch variable bound to the node.
    pub var: String,
    /// The entity being inserted.
    pub entity: EntityRef,
    /// Its type name.
    pub type_name: String,
}

/// A relationship the batch creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    /// Batch variable bound to the relationship.
    pub var: String,
    /// Start node.
    pub start: EntityRef,
    /// End node.
    pub end: EntityRef,
    /// Relationship type.
    pub rel_type: String,
    /// Type name of the start node.
    pub start_type: String,
    /// Type name of the end node.
    pub end_type: String,
    /// The relationship entity, when the edge carries one.
    pub entity: Option<EntityRef>,
}

/// Output of one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompiledBatch {
    /// Clauses in execution order.
    pub statements: StatementBatch,
    /// Nodes inserted by the batch, in visit order.
    pub new_nodes: Vec<NewNode>,
    /// Relationships created by the batch.
    pub new_relationships: Vec<NewRelationship>,
    /// Known relationship facts the batch deletes.
    pub deleted: Vec<Mappable>,
    /// Properties that failed to convert and were left out.
    pub warnings: Vec<ConversionWarning>,
    /// Batch variable of every visited node.
    pub variables: HashMap<EntityRef, String>,
}

impl CompiledBatch {
    /// The whole batch as one parameterised statement.
    pub fn statement(&self) -> Result<CypherStatement> {
        self.statements.combined()
    }

    /// Number of clauses of a kind.
    pub fn count(&self, statement_type: StatementType) -> usize {
        self.statements.count(statement_type)
    }

    /// Clauses of a kind.
    pub fn statements_of_type(&self, statement_type: StatementType) -> Vec<&CypherStatement> {
        self.statements.statements_of_type(statement_type)
    }

    /// Batch variable of a visited node.
    pub fn variable_of(&self, entity: EntityRef) -> Option<&str> {
        self.variables.get(&entity).map(String::as_str)
    }

    /// Inline Cypher rendering, one clause per line.
    pub fn render(&self, include_comments: bool) -> String {
        self.statements.render(include_comments)
    }

    /// Check if the batch holds no clauses.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Compile with the default [`CompilerConfig`].
pub fn compile(
    context: &MappingContext,
    graph: &EntityGraph,
    meta: &MetaData,
    roots: &[EntityRef],
    depth: Depth,
) -> Result<CompiledBatch> {
    Compiler::new(meta, context, graph).compile(roots, depth)
}

/// Compiles object graphs against one metadata index and context.
#[derive(Debug)]
pub struct Compiler<'a> {
    meta: &'a MetaData,
    context: &'a MappingContext,
    graph: &'a EntityGraph,
    config: CompilerConfig,
}

impl<'a> Compiler<'a> {
    /// Create a compiler with the default configuration.
    pub fn new(meta: &'a MetaData, context: &'a MappingContext, graph: &'a EntityGraph) -> Self {
        Self {
            meta,
            context,
            graph,
            config: CompilerConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile everything reachable from `roots` within `depth` hops.
    ///
    /// # Errors
    ///
    /// Fails without emitting anything on an unknown or abstract type, a
    /// stale handle, an endpoint type mismatch, a cardinality violation or a
    /// configured limit being exceeded.
    pub fn compile(&self, roots: &[EntityRef], depth: Depth) -> Result<CompiledBatch> {
        let walk = walk::walk(self.meta, self.graph, roots, depth, self.config.max_nodes)?;
        debug!(
            roots = roots.len(),
            nodes = walk.nodes.len(),
            relationship_entities = walk.relationship_entities.len(),
            ?depth,
            "compiling object graph"
        );

        let mut batch = CompiledBatch::default();
        self.node_clauses(&walk.nodes, &mut batch)?;
        let plan = diff::plan(self.meta, self.context, self.graph, &walk)?;
        self.relationship_clauses(plan, &mut batch)?;
        self.return_clause(&mut batch);

        debug!(
            clauses = batch.statements.len(),
            new_nodes = batch.new_nodes.len(),
            new_relationships = batch.new_relationships.len(),
            deleted = batch.deleted.len(),
            "compiled batch"
        );
        Ok(batch)
    }

    fn node_clauses(&self, nodes: &[EntityRef], batch: &mut CompiledBatch) -> Result<()> {
        let mut creates = Vec::new();
        let mut updates = Vec::new();

        for (i, &r) in nodes.iter().enumerate() {
            let var = format!("n{}", i);
            let entity = self.graph.try_get(r)?;
            let class = concrete_class(self.meta, &entity.type_name)?;
            batch.variables.insert(r, var.clone());

            match entity.id {
                None => {
                    let props = self.properties(class, entity, false, &mut batch.warnings)?;
                    let param = format!("{}_props", var);
                    let mut stmt = CypherStatement::create_node(format!(
                        "CREATE ({}{} ${})",
                        var,
                        escape_labels(&class.labels),
                        param
                    ))
                    .with_param(param, CypherValue::Map(props))
                    .binds(var.clone());
                    if self.config.include_comments {
                        stmt = stmt.with_comment(format!("create {}", class.name));
                    }
                    debug!(var = %var, type_name = %class.name, "context-new node");
                    creates.push(stmt);
                    batch.new_nodes.push(NewNode {
                        var,
                        entity: r,
                        type_name: class.name.clone(),
                    });
                }
                Some(id) => {
                    let props = self.properties(class, entity, true, &mut batch.warnings)?;
                    let id_param = format!("{}_id", var);
                    let props_param = format!("{}_props", var);
                    let mut stmt = CypherStatement::update_node(format!(
                        "MATCH ({v}) WHERE id({v}) = ${} SET {v} += ${}",
                        id_param,
                        props_param,
                        v = var
                    ))
                    .with_param(id_param, id)
                    .with_param(props_param, CypherValue::Map(props))
                    .binds(var.clone());
                    if self.config.include_comments {
                        stmt = stmt.with_comment(format!("update {}({})", class.name, id));
                    }
                    updates.push(stmt);
                }
            }
        }

        batch.statements.extend(creates);
        batch.statements.extend(updates);
        Ok(())
    }

    fn relationship_clauses(&self, plan: diff::EdgePlan, batch: &mut CompiledBatch) -> Result<()> {
        let mut counter = 0usize;
        let mut next_var = || {
            let var = format!("r{}", counter);
            counter += 1;
            var
        };

        for edge in plan.creates {
            let var = next_var();
            let start_var = self.node_var(batch, edge.start)?;
            let end_var = self.node_var(batch, edge.end)?;
            let start_type = self.graph.try_get(edge.start)?.type_name.clone();
            let end_type = self.graph.try_get(edge.end)?.type_name.clone();
            let rel = escape_relationship_type(&edge.rel_type);

            let mut stmt = match edge.entity {
                Some(re) => {
                    let entity = self.graph.try_get(re)?;
                    let class = concrete_class(self.meta, &entity.type_name)?;
                    let props = self.properties(class, entity, false, &mut batch.warnings)?;
                    let param = format!("{}_props", var);
                    CypherStatement::create_relationship(format!(
                        "CREATE ({})-[{}{} ${}]->({})",
                        start_var, var, rel, param, end_var
                    ))
                    .with_param(param, CypherValue::Map(props))
                }
                None if edge.undirected => CypherStatement::create_relationship(format!(
                    "MERGE ({})-[{}{}]-({})",
                    start_var, var, rel, end_var
                )),
                None => CypherStatement::create_relationship(format!(
                    "CREATE ({})-[{}{}]->({})",
                    start_var, var, rel, end_var
                )),
            }
            .binds(var.clone());
            if self.config.include_comments {
                stmt = stmt.with_comment(format!(
                    "create ({})-[:{}]->({})",
                    start_type, edge.rel_type, end_type
                ));
            }
            batch.statements.add(stmt);
            batch.new_relationships.push(NewRelationship {
                var,
                start: edge.start,
                end: edge.end,
                rel_type: edge.rel_type,
                start_type,
                end_type,
                entity: edge.entity,
            });
        }

        for update in plan.updates {
            let var = next_var();
            let entity = self.graph.try_get(update.entity)?;
            let class = concrete_class(self.meta, &entity.type_name)?;
            let props = self.properties(class, entity, true, &mut batch.warnings)?;
            let id_param = format!("{}_id", var);
            let props_param = format!("{}_props", var);
            let mut stmt = CypherStatement::update_relationship(format!(
                "MATCH ()-[{v}]->() WHERE id({v}) = ${} SET {v} += ${}",
                id_param,
                props_param,
                v = var
            ))
            .with_param(id_param, update.rel_id)
            .with_param(props_param, CypherValue::Map(props));
            if self.config.include_comments {
                stmt = stmt.with_comment(format!("update {}({})", class.name, update.rel_id));
            }
            batch.statements.add(stmt);
        }

        for known in &plan.deletes {
            let var = next_var();
            let mut stmt = match known.relationship_id {
                Some(rel_id) => {
                    let param = format!("{}_id", var);
                    CypherStatement::delete_relationship(format!(
                        "OPTIONAL MATCH ()-[{v}]->() WHERE id({v}) = ${} DELETE {v}",
                        param,
                        v = var
                    ))
                    .with_param(param, rel_id)
                }
                None => {
                    let start_param = format!("{}_start", var);
                    let end_param = format!("{}_end", var);
                    CypherStatement::delete_relationship(format!(
                        "OPTIONAL MATCH ({v}_s)-[{v}{}]->({v}_e) WHERE id({v}_s) = ${} AND id({v}_e) = ${} DELETE {v}",
                        escape_relationship_type(&known.rel_type),
                        start_param,
                        end_param,
                        v = var
                    ))
                    .with_param(start_param, known.start_id)
                    .with_param(end_param, known.end_id)
                }
            };
            if self.config.include_comments {
                stmt = stmt.with_comment(format!("delete {}", known));
            }
            batch.statements.add(stmt);
        }
        batch.deleted = plan.deletes;
        Ok(())
    }

    fn return_clause(&self, batch: &mut CompiledBatch) {
        if !self.config.return_new_ids {
            return;
        }
        let vars: Vec<&str> = batch
            .new_nodes
            .iter()
            .map(|n| n.var.as_str())
            .chain(batch.new_relationships.iter().map(|r| r.var.as_str()))
            .collect();
        if vars.is_empty() {
            return;
        }
        let projection: Vec<String> = vars.iter().map(|v| format!("id({v}) AS {v}")).collect();
        let stmt = CypherStatement::new(
            format!("RETURN {}", projection.join(", ")),
            StatementType::Return,
        );
        batch.statements.add(stmt);
    }

    fn node_var(&self, batch: &CompiledBatch, node: EntityRef) -> Result<String> {
        batch
            .variables
            .get(&node)
            .cloned()
            .ok_or_else(|| MappingError::StaleReference(node.to_string()))
    }

    /// Declared properties in graph form.
    ///
    /// Inserts leave unset fields out; updates send them as `null` so `SET +=`
    /// clears them.
    fn properties(
        &self,
        class: &ClassInfo,
        entity: &Entity,
        include_nulls: bool,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Result<BTreeMap<String, CypherValue>> {
        let mut out = BTreeMap::new();
        for field in &class.fields {
            let Some(value) = entity.properties.get(&field.name) else {
                if include_nulls {
                    out.insert(field.property.clone(), CypherValue::Null);
                }
                continue;
            };
            let value = match &field.converter {
                Some(converter) => match converter.to_graph_property(value) {
                    Ok(v) => v,
                    Err(e) => {
                        let warning =
                            ConversionWarning::new(&class.name, entity.id, &field.name, e.to_string());
                        warn!(%warning, "property conversion failed");
                        warnings.push(warning);
                        continue;
                    }
                },
                None => value.clone(),
            };
            if value.is_null() && !include_nulls {
                continue;
            }
            check_lengths(&value, &field.property, &self.config)?;
            out.insert(field.property.clone(), value);
        }
        Ok(out)
    }
}

fn check_lengths(value: &CypherValue, property: &str, config: &CompilerConfig) -> Result<()> {
    match value {
        CypherValue::String(s) => validate_string_length(s, property, config),
        CypherValue::List(items) => items
            .iter()
            .try_for_each(|v| check_lengths(v, property, config)),
        CypherValue::Map(map) => map
            .values()
            .try_for_each(|v| check_lengths(v, property, config)),
        _ => Ok(()),
    }
}

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

//! Unit of work over a database connection.
//!
//! A [`Session`] owns the entity graph and its mapping context and talks to
//! the database through a [`Request`]. Loads map responses into the graph;
//! saves compile the graph against the context, execute the batch and fold
//! the returned ids back in.
//!
//! ```
//! use std::sync::Arc;
//! use neogm::metadata::{ClassInfo, MetaData};
//! use neogm::response::{GraphModel, QueryStatistics, RowModel, RowValue, VecResponse};
//! use neogm::session::{Request, Session};
//! use neogm::{CypherStatement, CypherValue, Entity, Result};
//!
//! // Answers every write by returning id 1 for each column.
//! struct Echo;
//!
//! impl Request for Echo {
//!     type Graphs = VecResponse<GraphModel>;
//!     type Rows = VecResponse<RowModel>;
//!
//!     fn execute_graph(&mut self, _: &CypherStatement) -> Result<Self::Graphs> {
//!         Ok(VecResponse::from_items(Vec::new()))
//!     }
//!
//!     fn execute_rows(&mut self, stmt: &CypherStatement) -> Result<Self::Rows> {
//!         let row = RowModel::new(
//!             stmt.variables.iter().map(|_| RowValue::Scalar(CypherValue::Int(1))).collect(),
//!         );
//!         Ok(VecResponse::new(stmt.variables.clone(), vec![row]))
//!     }
//!
//!     fn execute_update(&mut self, _: &CypherStatement) -> Result<QueryStatistics> {
//!         Ok(QueryStatistics::default())
//!     }
//! }
//!
//! let meta = MetaData::builder().class(ClassInfo::node("Post")).build().unwrap();
//! let mut session = Session::new(Arc::new(meta), Echo);
//! let post = session.insert(Entity::new("Post"));
//! session.save(post).unwrap();
//! assert_eq!(session.graph().get(post).unwrap().id, Some(1));
//! ```

mod strategy;

pub use strategy::{delete_all, delete_node, delete_relationship, load_all, load_by_id};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::compiler::{CompiledBatch, Compiler};
use crate::config::{Depth, SessionConfig};
use crate::context::MappingContext;
use crate::cypher::{CypherStatement, CypherValue, StatementType};
use crate::error::{ConversionWarning, MappingError, Result};
use crate::graph::{Entity, EntityGraph, EntityRef};
use crate::mapper::{GraphMapper, MappingResult};
use crate::metadata::MetaData;
use crate::response::{GraphModel, QueryStatistics, Response, RowModel, RowValue};

/// Executes statements against a database.
///
/// Implementations report transport and server failures as
/// [`MappingError::Driver`](crate::MappingError::Driver).
pub trait Request {
    /// Response type of graph-shaped queries.
    type Graphs: Response<GraphModel>;
    /// Response type of row-shaped queries.
    type Rows: Response<RowModel>;

    /// Execute a statement whose results are read as graphs.
    fn execute_graph(&mut self, statement: &CypherStatement) -> Result<Self::Graphs>;

    /// Execute a statement whose results are read as rows.
    fn execute_rows(&mut self, statement: &CypherStatement) -> Result<Self::Rows>;

    /// Execute a write and report its statistics.
    fn execute_update(&mut self, statement: &CypherStatement) -> Result<QueryStatistics>;
}

/// Entity graph, mapping context and connection for one unit of work.
#[derive(Debug)]
pub struct Session<R: Request> {
    meta: Arc<MetaData>,
    request: R,
    context: MappingContext,
    graph: EntityGraph,
    config: SessionConfig,
    warnings: Vec<ConversionWarning>,
}

impl<R: Request> Session<R> {
    /// Open a session with the default configuration.
    pub fn new(meta: Arc<MetaData>, request: R) -> Self {
        Self {
            meta,
            request,
            context: MappingContext::new(),
            graph: EntityGraph::new(),
            config: SessionConfig::default(),
            warnings: Vec::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Mapping metadata.
    pub fn metadata(&self) -> &MetaData {
        &self.meta
    }

    /// Mapping context.
    pub fn context(&self) -> &MappingContext {
        &self.context
    }

    /// Entity graph.
    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Entity graph, for editing entities between saves.
    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    /// Underlying connection.
    pub fn request(&self) -> &R {
        &self.request
    }

    /// Underlying connection, mutably.
    pub fn request_mut(&mut self) -> &mut R {
        &mut self.request
    }

    /// Add a new entity to the graph.
    pub fn insert(&mut self, entity: Entity) -> EntityRef {
        self.graph.insert(entity)
    }

    /// Conversion warnings collected by loads and saves so far.
    pub fn warnings(&self) -> &[ConversionWarning] {
        &self.warnings
    }

    /// Drain the collected conversion warnings.
    pub fn take_warnings(&mut self) -> Vec<ConversionWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Load an entity by id at the default load depth.
    pub fn load(&mut self, type_name: &str, id: i64) -> Result<Option<EntityRef>> {
        self.load_with_depth(type_name, id, self.config.default_load_depth)
    }

    /// Load an entity by id and everything within `depth` hops of it.
    ///
    /// Returns `None` if the database holds no entity of `type_name` with
    /// that id. Entities already in the graph keep their handles.
    #[instrument(level = "debug", skip(self))]
    pub fn load_with_depth(
        &mut self,
        type_name: &str,
        id: i64,
        depth: Depth,
    ) -> Result<Option<EntityRef>> {
        let class = self.meta.require(type_name)?;
        let is_relationship_entity = class.is_relationship_entity();
        let statement = load_by_id(&self.meta, type_name, id, depth)?;
        let mut response = self.request.execute_graph(&statement)?;
        let result = mapper(&self.meta, &self.config).map(
            type_name,
            &mut response,
            &mut self.context,
            &mut self.graph,
        )?;
        self.warnings.extend(result.warnings);

        let found = if is_relationship_entity {
            self.context.get_relationship_entity(id)
        } else {
            self.context.live_node(&self.graph, id)
        };
        Ok(found.filter(|r| {
            self.graph
                .get(*r)
                .is_some_and(|e| self.meta.is_assignable(&e.type_name, type_name))
        }))
    }

    /// Load every entity of a type at the default load depth.
    pub fn load_all(&mut self, type_name: &str) -> Result<Vec<EntityRef>> {
        self.load_all_with_depth(type_name, self.config.default_load_depth)
    }

    /// Load every entity of a type with `depth` hops around each.
    #[instrument(level = "debug", skip(self))]
    pub fn load_all_with_depth(&mut self, type_name: &str, depth: Depth) -> Result<Vec<EntityRef>> {
        let statement = load_all(&self.meta, type_name, depth)?;
        let mut response = self.request.execute_graph(&statement)?;
        let result = mapper(&self.meta, &self.config).map(
            type_name,
            &mut response,
            &mut self.context,
            &mut self.graph,
        )?;
        self.warnings.extend(result.warnings);
        Ok(result.entities)
    }

    /// Run a row-shaped query and map its results as `type_name`.
    pub fn query(&mut self, type_name: &str, statement: &CypherStatement) -> Result<MappingResult> {
        let mut response = self.request.execute_rows(statement)?;
        let result = mapper(&self.meta, &self.config).map_rows(
            type_name,
            &mut response,
            &mut self.context,
            &mut self.graph,
        )?;
        self.warnings.extend(result.warnings.iter().cloned());
        Ok(result)
    }

    /// Save an entity and everything reachable from it at the default save
    /// depth.
    pub fn save(&mut self, root: EntityRef) -> Result<CompiledBatch> {
        self.save_all(&[root], self.config.default_save_depth)
    }

    /// Save an entity and everything within `depth` hops of it.
    pub fn save_with_depth(&mut self, root: EntityRef, depth: Depth) -> Result<CompiledBatch> {
        self.save_all(&[root], depth)
    }

    /// Save several roots in one batch.
    ///
    /// The context only changes once the database has accepted the batch;
    /// a failed request leaves it exactly as it was. A batch that returns
    /// ids but leaves out a new node's id (an update matched nothing and
    /// emptied the result) fails with `Driver`, since its creates may have
    /// run; the transaction should be rolled back.
    #[instrument(level = "debug", skip(self))]
    pub fn save_all(&mut self, roots: &[EntityRef], depth: Depth) -> Result<CompiledBatch> {
        let batch = Compiler::new(&self.meta, &self.context, &self.graph)
            .with_config(self.config.compiler.clone())
            .compile(roots, depth)?;
        self.warnings.extend(batch.warnings.iter().cloned());
        if batch.is_empty() {
            debug!("nothing to save");
            return Ok(batch);
        }

        let statement = batch.statement()?;
        let mut rows = self.request.execute_rows(&statement)?;
        let new_ids = returned_ids(&mut rows);
        if batch.count(StatementType::Return) > 0 {
            if let Some(node) = batch.new_nodes.iter().find(|n| !new_ids.contains_key(&n.var)) {
                warn!(var = %node.var, "save returned no id for a new node");
                return Err(MappingError::Driver(format!(
                    "no id returned for new node '{}'",
                    node.var
                )));
            }
        }
        self.context.acknowledge(&batch, &mut self.graph, &new_ids)?;
        debug!(
            clauses = batch.statements.len(),
            new_nodes = batch.new_nodes.len(),
            new_relationships = batch.new_relationships.len(),
            "saved"
        );
        Ok(batch)
    }

    /// Delete a persisted entity.
    ///
    /// Nodes are detach-deleted; relationship entities lose only their
    /// edge. The entity stays in the graph as a new entity with no id, and
    /// every other entity stops referring to it. Deleting an entity that
    /// was never saved only unlinks it.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, entity: EntityRef) -> Result<()> {
        let current = self.graph.try_get(entity)?;
        let class = self.meta.require(&current.type_name)?;
        if let Some(id) = current.id {
            if class.is_relationship_entity() {
                self.request.execute_update(&delete_relationship(id))?;
                if let Some(fact) = self.context.relationship_by_id(id).cloned() {
                    self.context.remove_relationship(&fact);
                }
                self.context.remove_relationship_entity(id);
            } else {
                self.request.execute_update(&delete_node(id))?;
                self.context.detach_node(id);
            }
        }

        self.unlink(entity);
        self.graph.try_get_mut(entity)?.id = None;
        Ok(())
    }

    /// Delete every entity of a type and forget them.
    pub fn delete_all(&mut self, type_name: &str) -> Result<QueryStatistics> {
        let is_relationship_entity = self.meta.require(type_name)?.is_relationship_entity();
        let statement = delete_all(&self.meta, type_name)?;
        let stats = self.request.execute_update(&statement)?;
        for entity in self.context.entities_of_type(&self.meta, type_name) {
            self.unlink(entity);
            let Some(id) = self.graph.get_mut(entity).and_then(|e| e.id.take()) else {
                continue;
            };
            if is_relationship_entity {
                if let Some(fact) = self.context.relationship_by_id(id).cloned() {
                    self.context.remove_relationship(&fact);
                }
            } else {
                self.context.detach_node(id);
            }
        }
        self.context.remove_type(&self.meta, type_name);
        Ok(stats)
    }

    /// Forget every entity. Handles from before the call stop resolving.
    pub fn clear(&mut self) {
        self.context.clear();
        self.graph = EntityGraph::new();
    }

    fn unlink(&mut self, target: EntityRef) {
        self.graph.purge_references(target);
    }
}

fn mapper<'a>(meta: &'a MetaData, config: &SessionConfig) -> GraphMapper<'a> {
    GraphMapper::new(meta).with_config(config.mapper.clone())
}

fn returned_ids<T: Response<RowModel>>(rows: &mut T) -> BTreeMap<String, i64> {
    let columns = rows.columns().to_vec();
    let mut ids = BTreeMap::new();
    if let Some(row) = rows.next() {
        for (column, value) in columns.into_iter().zip(row.values) {
            if let RowValue::Scalar(CypherValue::Int(id)) = value {
                ids.insert(column, id);
            }
        }
    }
    rows.close();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MappingError;
    use crate::metadata::ClassInfo;
    use crate::response::{NodeModel, RelationshipModel, VecResponse};

    #[derive(Debug, Default)]
    struct Scripted {
        graphs: Vec<GraphModel>,
        next_id: i64,
        executed: Vec<CypherStatement>,
        fail: bool,
    }

    impl Request for Scripted {
        type Graphs = VecResponse<GraphModel>;
        type Rows = VecResponse<RowModel>;

        fn execute_graph(&mut self, statement: &CypherStatement) -> Result<Self::Graphs> {
            self.executed.push(statement.clone());
            Ok(VecResponse::from_items(std::mem::take(&mut self.graphs)))
        }

        fn execute_rows(&mut self, statement: &CypherStatement) -> Result<Self::Rows> {
            self.executed.push(statement.clone());
            if self.fail {
                return Err(MappingError::Driver("connection reset".into()));
            }
            let mut values = Vec::new();
            for _ in &statement.variables {
                self.next_id += 1;
                values.push(RowValue::Scalar(CypherValue::Int(self.next_id)));
            }
            Ok(VecResponse::new(statement.variables.clone(), vec![RowModel::new(values)]))
        }

        fn execute_update(&mut self, statement: &CypherStatement) -> Result<QueryStatistics> {
            self.executed.push(statement.clone());
            Ok(QueryStatistics {
                contains_updates: true,
                ..Default::default()
            })
        }
    }

    fn meta() -> Arc<MetaData> {
        Arc::new(
            MetaData::builder()
                .class(ClassInfo::node("Actor").property("name").to_many("movies", "Movie"))
                .class(ClassInfo::node("Movie").property("title"))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_save_assigns_ids_and_second_save_is_clean() {
        let mut session = Session::new(meta(), Scripted::default());
        let movie = session.insert(Entity::new("Movie").with_property("title", "Heat"));
        let actor = session.insert(Entity::new("Actor").with_property("name", "Al"));
        session.graph_mut().add_related(actor, "movies", movie).unwrap();

        let first = session.save(actor).unwrap();
        assert_eq!(first.new_nodes.len(), 2);
        assert!(session.graph().get(actor).unwrap().id.is_some());
        assert!(session.graph().get(movie).unwrap().id.is_some());
        assert_eq!(session.context().relationship_count(), 1);

        let second = session.save(actor).unwrap();
        assert!(second.new_nodes.is_empty());
        assert!(second.new_relationships.is_empty());
    }

    #[test]
    fn test_failed_save_leaves_context_untouched() {
        let request = Scripted {
            fail: true,
            ..Default::default()
        };
        let mut session = Session::new(meta(), request);
        let actor = session.insert(Entity::new("Actor"));
        assert!(matches!(session.save(actor), Err(MappingError::Driver(_))));
        assert!(session.context().is_empty());
        assert!(session.graph().get(actor).unwrap().is_new());
    }

    #[test]
    fn test_load_reuses_handles() {
        let model = GraphModel::new()
            .with_node(NodeModel::new(5, ["Actor"]).with_property("name", "Al"))
            .with_node(NodeModel::new(9, ["Movie"]).with_property("title", "Heat"))
            .with_relationship(RelationshipModel::new(40, "MOVIES", 5, 9));
        let request = Scripted {
            graphs: vec![model.clone()],
            ..Default::default()
        };
        let mut session = Session::new(meta(), request);

        let actor = session.load("Actor", 5).unwrap().unwrap();
        assert_eq!(session.graph().get(actor).unwrap().related("movies").len(), 1);
        assert!(session.request().executed[0].query.contains("[*0..1]"));

        session.request_mut().graphs = vec![model];
        assert_eq!(session.load("Actor", 5).unwrap(), Some(actor));
        assert_eq!(session.load("Movie", 5).unwrap(), None);
    }

    #[test]
    fn test_delete_unlinks_and_detaches() {
        let mut session = Session::new(meta(), Scripted::default());
        let movie = session.insert(Entity::new("Movie"));
        let actor = session.insert(Entity::new("Actor"));
        session.graph_mut().add_related(actor, "movies", movie).unwrap();
        session.save(actor).unwrap();
        let movie_id = session.graph().get(movie).unwrap().id.unwrap();

        session.delete(movie).unwrap();
        assert!(session.graph().get(movie).unwrap().is_new());
        assert!(session.graph().get(actor).unwrap().related("movies").is_empty());
        assert!(!session.context().contains_node(movie_id));
        assert_eq!(session.context().relationship_count(), 0);
        let last = session.request().executed.last().unwrap();
        assert!(last.query.contains("DETACH DELETE"));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut session = Session::new(meta(), Scripted::default());
        let actor = session.insert(Entity::new("Actor"));
        session.save(actor).unwrap();
        session.clear();
        assert!(session.context().is_empty());
        assert!(session.graph().get(actor).is_none());
    }
}

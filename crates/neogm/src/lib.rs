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

//! Object-graph mapping between in-memory entity graphs and Neo4j.
//!
//! This crate provides functionality to:
//! - Describe entity types, their properties and relationship fields
//! - Compile an edited entity graph into one parameterised Cypher batch
//! - Map graph- and row-shaped query responses back into entities
//! - Track what has been persisted so each save only sends the difference
//!
//! # Mapping Strategy
//!
//! ## Entities → Neo4j
//!
//! | Entity Concept | Neo4j Representation |
//! |----------------|---------------------|
//! | Type (and supertypes) | Node labels |
//! | `id` | Native node id |
//! | Declared fields | Node properties (through converters) |
//! | Relationship field | Relationship of the field's type |
//! | Undirected field | One relationship per pair, `MERGE`d |
//! | Relationship entity | Relationship with properties |
//!
//! ## Neo4j → Entities
//!
//! | Neo4j Concept | Entity Representation |
//! |---------------|---------------------|
//! | Labels | Most specific mapped type |
//! | Properties | Field values |
//! | Relationship | Entries in the first matching field on each side |
//! | Relationship of an RE type | Relationship entity wired into both endpoints |
//!
//! # Example: Save
//!
//! ```rust
//! use neogm::metadata::{ClassInfo, MetaData};
//! use neogm::{Compiler, CompilerConfig, Depth, Entity, EntityGraph, MappingContext};
//! use std::collections::BTreeMap;
//!
//! let meta = MetaData::builder()
//!     .class(ClassInfo::node("Actor").property("name").to_many("actsIn", "Movie"))
//!     .class(ClassInfo::node("Movie").property("title"))
//!     .build()
//!     .unwrap();
//!
//! let mut context = MappingContext::new();
//! let mut graph = EntityGraph::new();
//! let actor = graph.insert(Entity::new("Actor").with_property("name", "Keanu"));
//! let movie = graph.insert(Entity::new("Movie").with_property("title", "Speed"));
//! graph.add_related(actor, "actsIn", movie).unwrap();
//!
//! let batch = Compiler::new(&meta, &context, &graph)
//!     .with_config(CompilerConfig::new().without_comments())
//!     .compile(&[actor], Depth::Unlimited)
//!     .unwrap();
//! println!("{}", batch.statement().unwrap().query);
//!
//! // After executing, hand the returned ids back.
//! let ids: BTreeMap<String, i64> =
//!     [("n0".to_string(), 5), ("n1".to_string(), 9), ("r0".to_string(), 40)].into();
//! context.acknowledge(&batch, &mut graph, &ids).unwrap();
//! assert_eq!(graph.get(actor).unwrap().id, Some(5));
//! assert!(context.find_relationship(5, "ACTS_IN", 9).is_some());
//! ```
//!
//! # Example: Load
//!
//! ```rust
//! use neogm::metadata::{ClassInfo, MetaData};
//! use neogm::response::{GraphModel, NodeModel, RelationshipModel};
//! use neogm::{EntityGraph, GraphMapper, MappingContext};
//!
//! let meta = MetaData::builder()
//!     .class(ClassInfo::node("Actor").property("name").to_many("actsIn", "Movie"))
//!     .class(ClassInfo::node("Movie").property("title"))
//!     .build()
//!     .unwrap();
//!
//! let model = GraphModel::new()
//!     .with_node(NodeModel::new(5, ["Actor"]).with_property("name", "Keanu"))
//!     .with_node(NodeModel::new(9, ["Movie"]).with_property("title", "Speed"))
//!     .with_relationship(RelationshipModel::new(40, "ACTS_IN", 5, 9));
//!
//! let mut context = MappingContext::new();
//! let mut graph = EntityGraph::new();
//! let result = GraphMapper::new(&meta)
//!     .map_graph("Actor", &model, &mut context, &mut graph)
//!     .unwrap();
//!
//! let actor = graph.get(result.entities[0]).unwrap();
//! assert_eq!(actor.related("actsIn").len(), 1);
//! ```
//!
//! # Generated Cypher Format
//!
//! A save is a single statement. Every clause that opens with a `MATCH`
//! re-projects the variables bound so far with `WITH`, and the new ids come
//! back in one row:
//!
//! ```cypher
//! CREATE (n0:Actor $n0_props)
//! CREATE (n1:Movie $n1_props)
//! WITH n0, n1
//! MATCH (n2) WHERE id(n2) = $n2_id SET n2 += $n2_props
//! CREATE (n0)-[r0:ACTS_IN]->(n1)
//! CREATE (n0)-[r1:ACTS_IN]->(n2)
//! RETURN id(n0) AS n0, id(n1) AS n1, id(r0) AS r0, id(r1) AS r1
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod compiler;
pub mod config;
pub mod context;
pub mod cypher;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod metadata;
pub mod response;
pub mod session;

// Re-export main types at crate root for convenience
pub use compiler::{compile, CompiledBatch, Compiler, NewNode, NewRelationship};
pub use config::{
    CompilerConfig, CompilerConfigBuilder, Depth, MapperConfig, SessionConfig,
    DEFAULT_MAX_STRING_LENGTH,
};
pub use context::{Mappable, MappableSlot, MappingContext};
pub use cypher::{CypherStatement, CypherValue, StatementBatch, StatementType};
pub use error::{ConversionWarning, MappingError, Result};
pub use graph::{Entity, EntityGraph, EntityRef, RelationshipValue};
pub use mapper::{GraphMapper, MappingResult};
pub use metadata::{ClassInfo, MetaData};
pub use session::{Request, Session};

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

//! Statements the session sends to load and delete entities.
//!
//! Loads are graph-shaped: every path within `depth` hops of the matched
//! entities is returned, so the mapper receives all nodes referenced by the
//! returned edges.

use crate::config::Depth;
use crate::cypher::{escape_labels, escape_relationship_type, CypherStatement, StatementType};
use crate::error::Result;
use crate::metadata::{ClassInfo, MetaData};

fn hops(depth: Depth) -> String {
    match depth {
        Depth::Unlimited => "[*0..]".to_string(),
        Depth::Limited(k) => format!("[*0..{}]", k),
    }
}

fn node_pattern(class: &ClassInfo, filter_by_id: bool, depth: Depth) -> String {
    let head = format!("MATCH (n{})", escape_labels(&class.labels));
    let head = if filter_by_id {
        format!("{} WHERE id(n) = $id", head)
    } else {
        head
    };
    if depth.is_exhausted() {
        format!("{} RETURN n", head)
    } else {
        format!("{} WITH n MATCH p=(n)-{}-(m) RETURN p", head, hops(depth))
    }
}

fn relationship_pattern(rel_type: &str, filter_by_id: bool, depth: Depth) -> String {
    let head = format!("MATCH p0=(s)-[r{}]->(e)", escape_relationship_type(rel_type));
    let head = if filter_by_id {
        format!("{} WHERE id(r) = $id", head)
    } else {
        head
    };
    if depth.is_exhausted() {
        format!("{} RETURN p0", head)
    } else {
        let h = hops(depth);
        format!(
            "{} WITH p0, s, e MATCH p1=(s)-{h}-(), p2=(e)-{h}-() RETURN p0, p1, p2",
            head
        )
    }
}

/// Load one entity and everything within `depth` hops of it.
///
/// ```
/// # use neogm::metadata::{ClassInfo, MetaData};
/// # use neogm::session::load_by_id;
/// # use neogm::Depth;
/// let meta = MetaData::builder().class(ClassInfo::node("Post")).build().unwrap();
/// let stmt = load_by_id(&meta, "Post", 7, Depth::Limited(1)).unwrap();
/// assert_eq!(stmt.query, "MATCH (n:Post) WHERE id(n) = $id WITH n MATCH p=(n)-[*0..1]-(m) RETURN p");
/// ```
pub fn load_by_id(meta: &MetaData, type_name: &str, id: i64, depth: Depth) -> Result<CypherStatement> {
    let class = meta.require(type_name)?;
    let query = match class.rel_type() {
        Some(rel_type) => relationship_pattern(rel_type, true, depth),
        None => node_pattern(class, true, depth),
    };
    Ok(CypherStatement::query(query)
        .with_param("id", id)
        .with_comment(format!("load {}({})", type_name, id)))
}

/// Load every entity of a type (subtypes included) with `depth` hops around
/// each.
pub fn load_all(meta: &MetaData, type_name: &str, depth: Depth) -> Result<CypherStatement> {
    let class = meta.require(type_name)?;
    let query = match class.rel_type() {
        Some(rel_type) => relationship_pattern(rel_type, false, depth),
        None => node_pattern(class, false, depth),
    };
    Ok(CypherStatement::query(query).with_comment(format!("load all {}", type_name)))
}

/// Delete a node and every relationship touching it.
pub fn delete_node(id: i64) -> CypherStatement {
    CypherStatement::new("MATCH (n) WHERE id(n) = $id DETACH DELETE n", StatementType::DeleteNode)
        .with_param("id", id)
}

/// Delete one relationship.
pub fn delete_relationship(id: i64) -> CypherStatement {
    CypherStatement::delete_relationship("MATCH ()-[r]->() WHERE id(r) = $id DELETE r")
        .with_param("id", id)
}

/// Delete every entity of a type.
pub fn delete_all(meta: &MetaData, type_name: &str) -> Result<CypherStatement> {
    let class = meta.require(type_name)?;
    Ok(match class.rel_type() {
        Some(rel_type) => CypherStatement::delete_relationship(format!(
            "MATCH ()-[r{}]->() DELETE r",
            escape_relationship_type(rel_type)
        )),
        None => CypherStatement::new(
            format!("MATCH (n{}) DETACH DELETE n", escape_labels(&class.labels)),
            StatementType::DeleteNode,
        ),
    })
}

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

//! Row-shaped results.

use tracing::trace;

use super::{GraphMapper, Hydration, MappingResult};
use crate::context::MappingContext;
use crate::cypher::CypherValue;
use crate::error::{MappingError, Result};
use crate::graph::{Entity, EntityGraph, EntityRef};
use crate::metadata::ClassInfo;
use crate::response::{GraphModel, Response, RowModel, RowValue};

impl<'a> GraphMapper<'a> {
    /// Map a row-shaped response.
    ///
    /// Node, relationship and path cells go through the same identity map as
    /// graph responses. A row with no such cells is read as the columns of a
    /// single `target_type` entity: columns are matched to fields by name
    /// (or property key), the identity column sets the id, and unnamed
    /// columns fill the declared fields in order. Such entities are added to
    /// the graph but not registered, since nothing proves they are nodes.
    pub fn map_rows<R: Response<RowModel>>(
        &self,
        target_type: &str,
        response: &mut R,
        context: &mut MappingContext,
        graph: &mut EntityGraph,
    ) -> Result<MappingResult> {
        let class = self.meta.require(target_type)?;
        let columns = response.columns().to_vec();
        let mut run = Hydration::default();

        while let Some(row) = response.next() {
            let mut shaped = GraphModel::default();
            for value in &row.values {
                match value {
                    RowValue::Node(node) => shaped.nodes.push(node.clone()),
                    RowValue::Relationship(rel) => shaped.relationships.push(rel.clone()),
                    RowValue::Path(path) => {
                        shaped.nodes.extend(path.nodes.iter().cloned());
                        shaped.relationships.extend(path.relationships.iter().cloned());
                    }
                    RowValue::Scalar(_) => {}
                }
            }

            if shaped.nodes.is_empty() && shaped.relationships.is_empty() {
                let r = self.scalar_entity(class, &columns, &row, graph, &mut run)?;
                run.touch(r);
            } else {
                self.map_model(&shaped, context, graph, &mut run)?;
            }
        }
        response.close();
        Ok(self.finish(target_type, run, graph))
    }

    fn scalar_entity(
        &self,
        class: &ClassInfo,
        columns: &[String],
        row: &RowModel,
        graph: &mut EntityGraph,
        run: &mut Hydration,
    ) -> Result<EntityRef> {
        if class.is_abstract {
            return Err(MappingError::InvalidMetadata(format!(
                "abstract type '{}' cannot be instantiated",
                class.name
            )));
        }

        let mut entity = Entity::new(class.name.clone());
        for (i, value) in row.values.iter().enumerate() {
            let RowValue::Scalar(raw) = value else { continue };
            let field = match columns.get(i) {
                Some(column) if column.as_str() == class.id_field_name() => {
                    if let CypherValue::Int(id) = raw {
                        entity.id = Some(*id);
                    }
                    continue;
                }
                Some(column) => class
                    .field_info(column)
                    .or_else(|| class.field_by_property(column)),
                None => class.fields.get(i),
            };
            let Some(field) = field else {
                trace!(column = i, "column matches no field");
                continue;
            };
            if let Some(converted) = self.convert(class, entity.id, field, raw, &mut run.warnings) {
                entity.properties.insert(field.name.clone(), converted);
            }
        }
        Ok(graph.insert(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetaData;
    use crate::response::{NodeModel, VecResponse};

    fn meta() -> MetaData {
        MetaData::builder()
            .class(ClassInfo::node("Movie").property("title").property("year"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_node_cells_use_identity_map() {
        let meta = meta();
        let mut ctx = MappingContext::new();
        let mut graph = EntityGraph::new();
        let node = NodeModel::new(9, ["Movie"]).with_property("title", "Y");
        let rows = vec![
            RowModel::new(vec![RowValue::Node(node.clone()), RowValue::Scalar(3i64.into())]),
            RowModel::new(vec![RowValue::Node(node), RowValue::Scalar(4i64.into())]),
        ];
        let mut response = VecResponse::new(vec!["m".into(), "count".into()], rows);
        let result = GraphMapper::new(&meta)
            .map_rows("Movie", &mut response, &mut ctx, &mut graph)
            .unwrap();

        assert_eq!(result.entities, vec![ctx.get_node(9).unwrap()]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_scalar_rows_by_column_name() {
        let meta = meta();
        let mut ctx = MappingContext::new();
        let mut graph = EntityGraph::new();
        let rows = vec![RowModel::new(vec![
            RowValue::Scalar(CypherValue::Int(9)),
            RowValue::Scalar(CypherValue::from("Y")),
            RowValue::Scalar(CypherValue::from("ignored")),
        ])];
        let mut response =
            VecResponse::new(vec!["id".into(), "title".into(), "other".into()], rows);
        let result = GraphMapper::new(&meta)
            .map_rows("Movie", &mut response, &mut ctx, &mut graph)
            .unwrap();

        let movie = graph.get(result.entities[0]).unwrap();
        assert_eq!(movie.id, Some(9));
        assert_eq!(movie.property("title"), Some(&CypherValue::from("Y")));
        assert_eq!(movie.properties.len(), 1);
        assert!(ctx.get_node(9).is_none());
    }

    #[test]
    fn test_scalar_rows_positional() {
        let meta = meta();
        let rows = vec![RowModel::new(vec![
            RowValue::Scalar(CypherValue::from("Y")),
            RowValue::Scalar(CypherValue::Int(1999)),
        ])];
        let mut response = VecResponse::from_items(rows);
        let mut graph = EntityGraph::new();
        let result = GraphMapper::new(&meta)
            .map_rows("Movie", &mut response, &mut MappingContext::new(), &mut graph)
            .unwrap();
        let movie = graph.get(result.entities[0]).unwrap();
        assert_eq!(movie.property("year"), Some(&CypherValue::Int(1999)));
        assert!(movie.is_new());
    }
}

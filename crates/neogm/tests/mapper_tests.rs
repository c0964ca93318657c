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

//! Mapper tests over the shared test domain.
//!
//! Test coverage:
//! - Identity map reuse across responses
//! - Reloading after an entity was dropped from the graph
//! - Field wiring by direction, inheritance and undirected edges
//! - Relationship entities
//! - Converters, conversion warnings and post-load hooks
//! - Unknown labels and unresolved endpoints
//! - Row-shaped responses

use neogm::response::{
    GraphModel, NodeModel, RelationshipModel, RowModel, RowValue, VecResponse,
};
use neogm::{
    compile, CypherValue, Depth, EntityGraph, GraphMapper, MapperConfig, MappingContext,
    MappingError, StatementType,
};
use neogm_test::fixtures::{self, responses, SLUG};

fn map(
    target: &str,
    model: &GraphModel,
    context: &mut MappingContext,
    graph: &mut EntityGraph,
) -> neogm::Result<neogm::MappingResult> {
    let meta = fixtures::domain();
    GraphMapper::new(&meta).map_graph(target, model, context, graph)
}

// ============================================================================
// Identity and Wiring
// ============================================================================

#[test]
fn test_actor_and_movie_are_linked_and_registered() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();

    let result = map("Actor", &responses::actor_in_movie(), &mut context, &mut graph).unwrap();
    assert_eq!(result.entities.len(), 1);
    let actor = result.entities[0];
    let movie = context.get_node(9).unwrap();

    assert_eq!(context.get_node(5), Some(actor));
    assert_eq!(graph.get(actor).unwrap().related("actsIn"), &[movie]);
    assert_eq!(graph.get(movie).unwrap().related("actors"), &[actor]);
    assert_eq!(
        graph.get(movie).unwrap().property("title"),
        Some(&CypherValue::from("Y"))
    );
    let fact = context.find_relationship(5, "ACTS_IN", 9).unwrap();
    assert_eq!(fact.relationship_id, Some(40));
}

#[test]
fn test_mapping_twice_reuses_handles() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let model = responses::actor_in_movie();

    let first = map("Actor", &model, &mut context, &mut graph).unwrap();
    let second = map("Actor", &model, &mut context, &mut graph).unwrap();

    assert_eq!(first.entities, second.entities);
    assert_eq!(graph.len(), 2);
    assert_eq!(context.relationship_count(), 1);
    assert_eq!(graph.get(first.entities[0]).unwrap().related("actsIn").len(), 1);
}

#[test]
fn test_reload_after_entity_dropped_rewires_edges() {
    let meta = fixtures::domain();
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let model = responses::actor_in_movie();

    let first = map("Actor", &model, &mut context, &mut graph).unwrap();
    let movie = context.get_node(9).unwrap();
    graph.remove(first.entities[0]);

    let second = map("Actor", &model, &mut context, &mut graph).unwrap();
    let actor = second.entities[0];
    assert_ne!(actor, first.entities[0]);
    assert_eq!(context.get_node(5), Some(actor));
    assert_eq!(graph.get(actor).unwrap().related("actsIn"), &[movie]);
    assert_eq!(graph.get(movie).unwrap().related("actors"), &[actor]);
    assert_eq!(context.relationship_count(), 1);

    let batch = compile(&context, &graph, &meta, &[actor], Depth::Unlimited).unwrap();
    assert_eq!(batch.count(StatementType::DeleteRelationship), 0);
    assert_eq!(batch.count(StatementType::CreateRelationship), 0);
}

#[test]
fn test_reload_after_relationship_endpoint_dropped() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let model = responses::user_rated_movie();

    map("Rating", &model, &mut context, &mut graph).unwrap();
    let user = context.get_node(1).unwrap();
    let movie = context.get_node(2).unwrap();
    let old_rating = context.get_relationship_entity(70).unwrap();
    graph.remove(user);

    let again = map("Rating", &model, &mut context, &mut graph).unwrap();
    let rating = again.entities[0];
    assert!(!graph.contains(old_rating));
    assert_eq!(context.get_relationship_entity(70), Some(rating));
    assert_eq!(graph.get(movie).unwrap().related("ratings"), &[rating]);
    let user = context.get_node(1).unwrap();
    assert_eq!(graph.get(user).unwrap().related("ratings"), &[rating]);
}

#[test]
fn test_response_stream_is_closed() {
    let meta = fixtures::domain();
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let mut response = VecResponse::from_items(vec![
        responses::actor_in_movie(),
        responses::user_rated_movie(),
    ]);

    let result = GraphMapper::new(&meta)
        .map("Movie", &mut response, &mut context, &mut graph)
        .unwrap();
    assert!(response.is_closed());
    assert_eq!(result.entities.len(), 2);
}

#[test]
fn test_inherited_types_and_undirected_edges() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();

    let result = map("Person", &responses::classroom(), &mut context, &mut graph).unwrap();
    assert_eq!(result.entities.len(), 3);

    let teacher = context.get_node(10).unwrap();
    let bo = context.get_node(11).unwrap();
    let cy = context.get_node(12).unwrap();
    assert_eq!(graph.get(teacher).unwrap().type_name, "Teacher");
    assert_eq!(graph.get(cy).unwrap().type_name, "Student");
    assert_eq!(graph.get(teacher).unwrap().related("students"), &[bo, cy]);
    assert_eq!(graph.get(bo).unwrap().related("teacher"), &[teacher]);
    assert_eq!(graph.get(bo).unwrap().related("friends"), &[cy]);
    assert_eq!(graph.get(cy).unwrap().related("friends"), &[bo]);

    let students = map("Student", &responses::classroom(), &mut context, &mut graph).unwrap();
    assert_eq!(students.entities, vec![bo, cy]);
}

#[test]
fn test_self_loop_maps_to_one_entity() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let model = GraphModel::new()
        .with_node(NodeModel::new(20, ["Post"]).with_property("title", "A"))
        .with_relationship(RelationshipModel::new(60, "NEXT", 20, 20));

    let result = map("Post", &model, &mut context, &mut graph).unwrap();
    assert_eq!(result.entities.len(), 1);
    let post = result.entities[0];
    assert_eq!(graph.get(post).unwrap().related("next"), &[post]);
}

#[test]
fn test_relationship_entity_is_wired_into_both_endpoints() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();

    let result = map("Rating", &responses::user_rated_movie(), &mut context, &mut graph).unwrap();
    assert_eq!(result.entities.len(), 1);
    let rating = result.entities[0];
    let user = context.get_node(1).unwrap();
    let movie = context.get_node(2).unwrap();

    let entity = graph.get(rating).unwrap();
    assert_eq!(entity.id, Some(70));
    assert_eq!(entity.start, Some(user));
    assert_eq!(entity.end, Some(movie));
    assert_eq!(entity.property("stars"), Some(&CypherValue::Int(4)));
    assert_eq!(graph.get(user).unwrap().related("ratings"), &[rating]);
    assert_eq!(graph.get(movie).unwrap().related("ratings"), &[rating]);
    assert_eq!(context.get_relationship_entity(70), Some(rating));

    let again = map("Rating", &responses::user_rated_movie(), &mut context, &mut graph).unwrap();
    assert_eq!(again.entities, vec![rating]);
}

#[test]
fn test_edge_to_registered_node_outside_response() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    map("Actor", &responses::actor_in_movie(), &mut context, &mut graph).unwrap();

    let model = GraphModel::new()
        .with_node(NodeModel::new(6, ["Actor"]).with_property("name", "Z"))
        .with_relationship(RelationshipModel::new(41, "ACTS_IN", 6, 9));
    map("Actor", &model, &mut context, &mut graph).unwrap();

    let movie = context.get_node(9).unwrap();
    assert_eq!(graph.get(movie).unwrap().related("actors").len(), 2);
}

// ============================================================================
// Converters and Hooks
// ============================================================================

#[test]
fn test_converters_and_post_load_hook() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();

    let result = map("Article", &responses::article("PUBLISHED"), &mut context, &mut graph).unwrap();
    assert!(result.warnings.is_empty());
    let article = graph.get(result.entities[0]).unwrap();
    assert_eq!(article.property("status"), Some(&CypherValue::from("PUBLISHED")));
    let expected: CypherValue = serde_json::from_str(r#"{"tags":["a","b"]}"#).unwrap();
    assert_eq!(article.property("meta"), Some(&expected));
    assert_eq!(article.property(SLUG), Some(&CypherValue::from("hello-world")));
}

#[test]
fn test_conversion_failure_is_a_warning() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();

    let result = map("Article", &responses::article("BOGUS"), &mut context, &mut graph).unwrap();
    assert_eq!(result.warnings.len(), 1);
    let warning = &result.warnings[0];
    assert_eq!(warning.type_name, "Article");
    assert_eq!(warning.entity_id, Some(30));
    assert_eq!(warning.field, "status");
    let article = graph.get(result.entities[0]).unwrap();
    assert!(article.property("status").is_none());
    assert!(article.property("title").is_some());
}

#[test]
fn test_post_load_can_be_disabled() {
    let meta = fixtures::domain();
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();

    let result = GraphMapper::new(&meta)
        .with_config(MapperConfig::new().without_post_load())
        .map_graph("Article", &responses::article("DRAFT"), &mut context, &mut graph)
        .unwrap();
    assert!(graph.get(result.entities[0]).unwrap().property(SLUG).is_none());
}

// ============================================================================
// Malformed Responses
// ============================================================================

#[test]
fn test_edge_to_unknown_node_is_fatal() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let err = map("Post", &responses::unknown_neighbour(), &mut context, &mut graph).unwrap_err();
    assert!(matches!(err, MappingError::UnknownLabels(labels) if labels == vec!["Alien".to_string()]));
}

#[test]
fn test_lone_unknown_node_is_skipped_unless_strict() {
    let meta = fixtures::domain();
    let model = GraphModel::new()
        .with_node(NodeModel::new(20, ["Post"]))
        .with_node(NodeModel::new(50, ["Alien"]));

    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let result = GraphMapper::new(&meta)
        .map_graph("Post", &model, &mut context, &mut graph)
        .unwrap();
    assert_eq!(result.entities.len(), 1);
    assert!(!context.contains_node(50));

    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let err = GraphMapper::new(&meta)
        .with_config(MapperConfig::new().strict())
        .map_graph("Post", &model, &mut context, &mut graph)
        .unwrap_err();
    assert!(matches!(err, MappingError::UnknownLabels(_)));
}

#[test]
fn test_unresolved_endpoint() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let model = GraphModel::new()
        .with_node(NodeModel::new(20, ["Post"]))
        .with_relationship(RelationshipModel::new(60, "NEXT", 20, 77));
    let err = map("Post", &model, &mut context, &mut graph).unwrap_err();
    assert!(matches!(
        err,
        MappingError::UnresolvedEndpoint {
            rel_id: 60,
            node_id: 77
        }
    ));
}

#[test]
fn test_unknown_target_type() {
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let err = map("Nope", &responses::actor_in_movie(), &mut context, &mut graph).unwrap_err();
    assert!(matches!(err, MappingError::UnknownType(_)));
}

// ============================================================================
// Rows
// ============================================================================

#[test]
fn test_rows_with_node_cells() {
    let meta = fixtures::domain();
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let mut response = VecResponse::new(
        vec!["a".to_string(), "m".to_string()],
        vec![RowModel::new(vec![
            RowValue::Node(NodeModel::new(5, ["Actor"]).with_property("name", "X")),
            RowValue::Node(NodeModel::new(9, ["Movie"])),
        ])],
    );

    let result = GraphMapper::new(&meta)
        .map_rows("Actor", &mut response, &mut context, &mut graph)
        .unwrap();
    assert_eq!(result.entities, vec![context.get_node(5).unwrap()]);
    assert!(context.contains_node(9));
}

#[test]
fn test_scalar_rows_fill_fields_by_column() {
    let meta = fixtures::domain();
    let mut context = MappingContext::new();
    let mut graph = EntityGraph::new();
    let mut response = VecResponse::new(
        vec!["id".to_string(), "title".to_string()],
        vec![RowModel::new(vec![
            RowValue::Scalar(CypherValue::Int(20)),
            RowValue::Scalar(CypherValue::from("P")),
        ])],
    );

    let result = GraphMapper::new(&meta)
        .map_rows("Post", &mut response, &mut context, &mut graph)
        .unwrap();
    let post = graph.get(result.entities[0]).unwrap();
    assert_eq!(post.id, Some(20));
    assert_eq!(post.property("title"), Some(&CypherValue::from("P")));
    assert!(!context.contains_node(20));
}

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

//! Session tests against a scripted connection.
//!
//! Test coverage:
//! - Save assigns ids and a second save sends no creates
//! - Failed writes leave the context untouched
//! - Missing returned ids fail the save
//! - Loads reuse handles and honour depth
//! - Delete, delete-all and clear

use neogm::response::{RowModel, RowValue};
use neogm::{CypherStatement, CypherValue, Depth, Entity, MappingError, Session, SessionConfig, StatementType};
use neogm_test::fixtures::{self, responses};
use neogm_test::ScriptedRequest;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn session(request: ScriptedRequest) -> Session<ScriptedRequest> {
    init_tracing();
    Session::new(fixtures::shared_domain(), request)
}

#[test]
fn test_save_then_save_again() {
    let mut session = session(ScriptedRequest::new());
    let movie = session.insert(Entity::new("Movie").with_property("title", "Heat"));
    let mut refs = Vec::new();
    for name in ["Al", "Bob"] {
        let a = session.insert(Entity::new("Actor").with_property("name", name));
        session.graph_mut().add_related(a, "actsIn", movie).unwrap();
        refs.push(a);
    }

    let first = session.save(movie).unwrap();
    // Movie.actors is empty, so only the movie itself is reached.
    assert_eq!(first.new_nodes.len(), 1);

    let batch = session.save_all(&refs, Depth::Unlimited).unwrap();
    assert_eq!(batch.new_nodes.len(), 2);
    assert_eq!(batch.new_relationships.len(), 2);
    assert_eq!(session.context().relationship_count(), 2);
    let first_id = session.request().first_id();
    assert_eq!(session.graph().get(movie).unwrap().id, Some(first_id));

    let again = session.save_all(&refs, Depth::Unlimited).unwrap();
    assert!(again.new_nodes.is_empty());
    assert!(again.new_relationships.is_empty());
    assert_eq!(again.count(StatementType::UpdateNode), 3);
    assert_eq!(session.request().executed.len(), 3);
}

#[test]
fn test_failed_write_leaves_context_untouched() {
    let mut session = session(ScriptedRequest::new().failing_writes());
    let post = session.insert(Entity::new("Post").with_property("title", "A"));

    let err = session.save(post).unwrap_err();
    assert!(matches!(err, MappingError::Driver(_)));
    assert!(session.context().is_empty());
    assert!(session.graph().get(post).unwrap().is_new());
}

#[test]
fn test_save_without_returned_ids_fails() {
    let request = ScriptedRequest::new()
        .with_graphs(vec![responses::actor_in_movie()])
        .unmatched_writes();
    let mut session = session(request);
    let actor = session.load("Actor", 5).unwrap().unwrap();
    let movie = session.insert(Entity::new("Movie").with_property("title", "Ronin"));
    session.graph_mut().add_related(actor, "actsIn", movie).unwrap();

    let err = session.save(actor).unwrap_err();
    assert!(matches!(err, MappingError::Driver(ref message) if message.contains("no id returned")));
    assert!(session.graph().get(movie).unwrap().is_new());
    assert_eq!(session.context().node_count(), 2);
    assert_eq!(session.context().relationship_count(), 1);
}

#[test]
fn test_load_by_id_and_reload() {
    let request = ScriptedRequest::new()
        .with_graphs(vec![responses::actor_in_movie()])
        .with_graphs(vec![responses::actor_in_movie()]);
    let mut session = session(request);

    let actor = session.load("Actor", 5).unwrap().unwrap();
    let stmt = session.request().last().unwrap();
    assert_eq!(stmt.parameters["id"], CypherValue::Int(5));
    assert!(stmt.query.contains("[*0..1]"));

    assert_eq!(session.load_with_depth("Actor", 5, Depth::Limited(0)).unwrap(), Some(actor));
    assert_eq!(session.request().last().unwrap().query, "MATCH (n:Actor) WHERE id(n) = $id RETURN n");
    assert_eq!(session.graph().len(), 2);
}

#[test]
fn test_load_missing_entity() {
    let mut session = session(ScriptedRequest::new());
    assert_eq!(session.load("Post", 1).unwrap(), None);
}

#[test]
fn test_load_all_with_configured_depth() {
    let request = ScriptedRequest::new().with_graphs(vec![responses::classroom()]);
    let mut session = session(request).with_config(SessionConfig::new().with_load_depth(Depth::Limited(2)));

    let people = session.load_all("Person").unwrap();
    assert_eq!(people.len(), 3);
    assert_eq!(
        session.request().last().unwrap().query,
        "MATCH (n:Person) WITH n MATCH p=(n)-[*0..2]-(m) RETURN p"
    );
}

#[test]
fn test_loaded_relationship_entity() {
    let request = ScriptedRequest::new().with_graphs(vec![responses::user_rated_movie()]);
    let mut session = session(request);
    let rating = session.load("Rating", 70).unwrap().unwrap();
    assert_eq!(session.graph().get(rating).unwrap().property("stars"), Some(&CypherValue::Int(4)));

    session.graph_mut().get_mut(rating).unwrap().set_property("stars", 2i64);
    let batch = session.save(rating).unwrap();
    assert_eq!(batch.count(StatementType::UpdateRelationship), 1);
    assert_eq!(batch.count(StatementType::CreateRelationship), 0);
}

#[test]
fn test_query_maps_rows() {
    let request = ScriptedRequest::new().with_rows(
        vec!["id".to_string(), "title".to_string()],
        vec![RowModel::new(vec![
            RowValue::Scalar(CypherValue::Int(3)),
            RowValue::Scalar(CypherValue::from("Q")),
        ])],
    );
    let mut session = session(request);
    let result = session
        .query("Post", &CypherStatement::query("MATCH (p:Post) RETURN id(p) AS id, p.title AS title"))
        .unwrap();
    assert_eq!(result.entities.len(), 1);
    assert_eq!(session.graph().get(result.entities[0]).unwrap().id, Some(3));
}

#[test]
fn test_delete_detaches_node() {
    let mut session = session(ScriptedRequest::new());
    let a = session.insert(Entity::new("Post").with_property("title", "A"));
    let b = session.insert(Entity::new("Post").with_property("title", "B"));
    session.graph_mut().set_related(a, "next", b).unwrap();
    session.save(a).unwrap();
    let b_id = session.graph().get(b).unwrap().id.unwrap();

    session.delete(b).unwrap();
    assert!(session.graph().get(b).unwrap().is_new());
    assert!(session.graph().get(a).unwrap().related("next").is_empty());
    assert!(!session.context().contains_node(b_id));
    assert_eq!(session.context().relationship_count(), 0);
    let last = session.request().last().unwrap();
    assert_eq!(last.statement_type, StatementType::DeleteNode);
    assert_eq!(last.parameters["id"], CypherValue::Int(b_id));

    // Nothing left to delete on the next save.
    let batch = session.save(a).unwrap();
    assert_eq!(batch.count(StatementType::DeleteRelationship), 0);
    assert!(batch.new_nodes.is_empty());
}

#[test]
fn test_delete_relationship_entity_keeps_endpoints() {
    let request = ScriptedRequest::new().with_graphs(vec![responses::user_rated_movie()]);
    let mut session = session(request);
    let rating = session.load("Rating", 70).unwrap().unwrap();

    session.delete(rating).unwrap();
    assert!(session.context().contains_node(1));
    assert!(session.context().contains_node(2));
    assert!(session.context().get_relationship_entity(70).is_none());
    assert!(session.context().relationship_by_id(70).is_none());
    let user = session.context().get_node(1).unwrap();
    assert!(session.graph().get(user).unwrap().related("ratings").is_empty());
    assert_eq!(
        session.request().last().unwrap().statement_type,
        StatementType::DeleteRelationship
    );
}

#[test]
fn test_delete_all_and_clear() {
    let request = ScriptedRequest::new().with_graphs(vec![responses::classroom()]);
    let mut session = session(request);
    session.load_all("Person").unwrap();

    session.delete_all("Student").unwrap();
    assert!(session.context().contains_node(10));
    assert!(!session.context().contains_node(11));
    assert!(session.context().relationships().all(|m| m.start_id != 11 && m.end_id != 11));
    assert_eq!(
        session.request().last().unwrap().query,
        "MATCH (n:Person:Student) DETACH DELETE n"
    );

    session.clear();
    assert!(session.context().is_empty());
    assert!(session.graph().is_empty());
}

#[test]
fn test_save_collects_conversion_warnings() {
    let mut session = session(ScriptedRequest::new());
    let article = session.insert(
        Entity::new("Article")
            .with_property("title", "T")
            .with_property("status", "BOGUS"),
    );
    session.save(article).unwrap();
    let warnings = session.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "status");
    assert!(session.warnings().is_empty());
}

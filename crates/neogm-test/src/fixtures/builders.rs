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

//! Builders for entity graphs over the test domain.
//!
//! Every builder returns new entities (no ids) so tests decide what is
//! persisted by acknowledging a compiled batch.

use neogm::{Entity, EntityGraph, EntityRef};

/// `Post` entities linked through `next` in order.
///
/// ```
/// let (graph, posts) = neogm_test::fixtures::builders::post_chain(&["A", "B", "C"]);
/// assert_eq!(graph.get(posts[0]).unwrap().related("next"), &[posts[1]]);
/// ```
pub fn post_chain(titles: &[&str]) -> (EntityGraph, Vec<EntityRef>) {
    let mut graph = EntityGraph::new();
    let posts: Vec<EntityRef> = titles
        .iter()
        .map(|t| graph.insert(Entity::new("Post").with_property("title", *t)))
        .collect();
    for pair in posts.windows(2) {
        set(&mut graph, pair[0], "next", pair[1]);
    }
    (graph, posts)
}

/// A chain of `n` posts whose last post points back at the first.
pub fn post_cycle(n: usize) -> (EntityGraph, Vec<EntityRef>) {
    let titles: Vec<String> = (0..n).map(|i| format!("post-{}", i)).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let (mut graph, posts) = post_chain(&refs);
    if let (Some(&first), Some(&last)) = (posts.first(), posts.last()) {
        set(&mut graph, last, "next", first);
    }
    (graph, posts)
}

/// Actors who all act in one movie, linked from both sides.
#[derive(Debug, Clone)]
pub struct Cast {
    /// The graph holding every entity.
    pub graph: EntityGraph,
    /// Actors, in argument order.
    pub actors: Vec<EntityRef>,
    /// The movie.
    pub movie: EntityRef,
}

/// Build a [`Cast`].
pub fn cast(title: &str, names: &[&str]) -> Cast {
    let mut graph = EntityGraph::new();
    let movie = graph.insert(Entity::new("Movie").with_property("title", title));
    let mut actors = Vec::with_capacity(names.len());
    for name in names {
        let actor = graph.insert(Entity::new("Actor").with_property("name", *name));
        link(&mut graph, actor, "actsIn", movie);
        link(&mut graph, movie, "actors", actor);
        actors.push(actor);
    }
    Cast {
        graph,
        actors,
        movie,
    }
}

/// A teacher with students, wired on both sides, plus undirected
/// friendships between consecutive students.
#[derive(Debug, Clone)]
pub struct Classroom {
    /// The graph holding every entity.
    pub graph: EntityGraph,
    /// The teacher.
    pub teacher: EntityRef,
    /// Students, in argument order.
    pub students: Vec<EntityRef>,
}

/// Build a [`Classroom`].
pub fn classroom(teacher: &str, students: &[&str]) -> Classroom {
    let mut graph = EntityGraph::new();
    let t = graph.insert(Entity::new("Teacher").with_property("name", teacher));
    let mut refs = Vec::with_capacity(students.len());
    for name in students {
        let s = graph.insert(Entity::new("Student").with_property("name", *name));
        link(&mut graph, t, "students", s);
        set(&mut graph, s, "teacher", t);
        refs.push(s);
    }
    for pair in refs.windows(2) {
        link(&mut graph, pair[0], "friends", pair[1]);
        link(&mut graph, pair[1], "friends", pair[0]);
    }
    Classroom {
        graph,
        teacher: t,
        students: refs,
    }
}

/// A user who rated a movie.
#[derive(Debug, Clone)]
pub struct Rated {
    /// The graph holding every entity.
    pub graph: EntityGraph,
    /// The user.
    pub user: EntityRef,
    /// The movie.
    pub movie: EntityRef,
    /// The rating relationship entity.
    pub rating: EntityRef,
}

/// Build a [`Rated`] with the rating referenced from both endpoints.
pub fn rated(user: &str, title: &str, stars: i64) -> Rated {
    let mut graph = EntityGraph::new();
    let u = graph.insert(Entity::new("User").with_property("name", user));
    let m = graph.insert(Entity::new("Movie").with_property("title", title));
    let r = graph.insert(
        Entity::new("Rating")
            .with_property("stars", stars)
            .between(u, m),
    );
    link(&mut graph, u, "ratings", r);
    link(&mut graph, m, "ratings", r);
    Rated {
        graph,
        user: u,
        movie: m,
        rating: r,
    }
}

fn link(graph: &mut EntityGraph, from: EntityRef, field: &str, to: EntityRef) {
    graph
        .add_related(from, field, to)
        .unwrap_or_else(|e| panic!("fixture link failed: {}", e));
}

fn set(graph: &mut EntityGraph, from: EntityRef, field: &str, to: EntityRef) {
    graph
        .set_related(from, field, to)
        .unwrap_or_else(|e| panic!("fixture link failed: {}", e));
}

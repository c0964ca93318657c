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

//! Canned graph responses over the test domain.

use neogm::response::{GraphModel, NodeModel, RelationshipModel};

/// Actor 5 acting in movie 9 through relationship 40.
pub fn actor_in_movie() -> GraphModel {
    GraphModel::new()
        .with_node(NodeModel::new(5, ["Actor"]).with_property("name", "X"))
        .with_node(NodeModel::new(9, ["Movie"]).with_property("title", "Y"))
        .with_relationship(RelationshipModel::new(40, "ACTS_IN", 5, 9))
}

/// User 1 rated movie 2 with four stars through relationship 70.
pub fn user_rated_movie() -> GraphModel {
    GraphModel::new()
        .with_node(NodeModel::new(1, ["User"]).with_property("name", "u"))
        .with_node(NodeModel::new(2, ["Movie"]).with_property("title", "m"))
        .with_relationship(RelationshipModel::new(70, "RATED", 1, 2).with_property("stars", 4i64))
}

/// Teacher 10 with students 11 and 12, who are friends.
pub fn classroom() -> GraphModel {
    GraphModel::new()
        .with_node(NodeModel::new(10, ["Person", "Teacher"]).with_property("name", "Ada"))
        .with_node(NodeModel::new(11, ["Person", "Student"]).with_property("name", "Bo"))
        .with_node(NodeModel::new(12, ["Student", "Person"]).with_property("name", "Cy"))
        .with_relationship(RelationshipModel::new(100, "TEACHES", 10, 11))
        .with_relationship(RelationshipModel::new(101, "TEACHES", 10, 12))
        .with_relationship(RelationshipModel::new(102, "FRIEND", 11, 12))
}

/// Students 11 and 12 joined by FRIEND relationship 102, stored from
/// `start` to `end`.
pub fn friends(start: i64, end: i64) -> GraphModel {
    GraphModel::new()
        .with_node(NodeModel::new(11, ["Person", "Student"]).with_property("name", "Bo"))
        .with_node(NodeModel::new(12, ["Person", "Student"]).with_property("name", "Cy"))
        .with_relationship(RelationshipModel::new(102, "FRIEND", start, end))
}

/// Article 30 with converted properties. `status` is the stored enum name.
pub fn article(status: &str) -> GraphModel {
    GraphModel::new().with_node(
        NodeModel::new(30, ["Article"])
            .with_property("title", "Hello World")
            .with_property("status", status)
            .with_property("metadata", r#"{"tags":["a","b"]}"#),
    )
}

/// A node whose labels match nothing in the domain, linked to post 20.
pub fn unknown_neighbour() -> GraphModel {
    GraphModel::new()
        .with_node(NodeModel::new(20, ["Post"]).with_property("title", "P"))
        .with_node(NodeModel::new(50, ["Alien"]))
        .with_relationship(RelationshipModel::new(60, "NEXT", 20, 50))
}

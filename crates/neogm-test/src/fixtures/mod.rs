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

//! Canonical test domain.
//!
//! One [`MetaData`] covers every shape the mapper has to handle:
//!
//! - **Post**: self-referencing chain through `next`
//! - **Actor / Movie**: to-many edge read from both sides
//! - **Person / Teacher / Student**: abstract supertype, undirected
//!   `friends`, inherited fields
//! - **User / Rating / Movie**: relationship entity with properties
//! - **Article**: converted properties and a post-load hook

pub mod builders;
pub mod responses;

use std::sync::Arc;

use neogm::metadata::{
    ClassInfo, EnumConverter, FieldInfo, JsonStringConverter, MetaData, RelationshipInfo,
};
use neogm::CypherValue;

/// Property the `Article` post-load hook derives from `title`.
pub const SLUG: &str = "slug";

/// The full test domain.
pub fn domain() -> MetaData {
    domain_builder()
        .build()
        .unwrap_or_else(|e| panic!("test domain is invalid: {}", e))
}

/// The full test domain behind an [`Arc`], as sessions take it.
pub fn shared_domain() -> Arc<MetaData> {
    Arc::new(domain())
}

fn domain_builder() -> neogm::metadata::MetaDataBuilder {
    MetaData::builder()
        .class(ClassInfo::node("Post").property("title").to_one("next", "Post"))
        .class(
            ClassInfo::node("Actor")
                .property("name")
                .to_many("actsIn", "Movie"),
        )
        .class(
            ClassInfo::node("Movie")
                .property("title")
                .relationship(
                    RelationshipInfo::many("actors", "Actor")
                        .with_type("ACTS_IN")
                        .incoming(),
                )
                .relationship(
                    RelationshipInfo::many("ratings", "Rating")
                        .with_type("RATED")
                        .incoming(),
                ),
        )
        .class(
            ClassInfo::node("User")
                .property("name")
                .relationship(RelationshipInfo::many("ratings", "Rating").with_type("RATED")),
        )
        .class(
            ClassInfo::relationship_entity("Rating", "RATED", "User", "Movie")
                .property("stars")
                .property("comment"),
        )
        .class(
            ClassInfo::node("Person")
                .abstract_type()
                .property("name")
                .relationship(
                    RelationshipInfo::many("friends", "Person")
                        .with_type("FRIEND")
                        .undirected(),
                ),
        )
        .class(
            ClassInfo::node("Teacher")
                .extends("Person")
                .relationship(RelationshipInfo::many("students", "Student").with_type("TEACHES")),
        )
        .class(
            ClassInfo::node("Student").extends("Person").relationship(
                RelationshipInfo::one("teacher", "Teacher")
                    .with_type("TEACHES")
                    .incoming(),
            ),
        )
        .class(
            ClassInfo::node("Article")
                .property("title")
                .field(FieldInfo::new("status").with_converter(Arc::new(EnumConverter::new([
                    "DRAFT",
                    "PUBLISHED",
                    "ARCHIVED",
                ]))))
                .field(
                    FieldInfo::new("meta")
                        .stored_as("metadata")
                        .with_converter(Arc::new(JsonStringConverter)),
                )
                .on_post_load(|graph, article| {
                    if let Some(entity) = graph.get_mut(article) {
                        let slug = entity
                            .property("title")
                            .and_then(CypherValue::as_str)
                            .map(|t| t.to_lowercase().replace(' ', "-"));
                        if let Some(slug) = slug {
                            entity.set_property(SLUG, slug);
                        }
                    }
                }),
        )
}

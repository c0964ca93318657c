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

//! Shared domain fixtures for neogm tests and benchmarks.
//!
//! This crate provides a mapped test domain, graph builders, canned query
//! responses and a scripted [`Request`](neogm::Request) so the compiler,
//! mapper and session tests all exercise the same entities.
//!
//! # Quick Start
//!
//! ```rust
//! use neogm::{compile, Depth, MappingContext};
//! use neogm_test::fixtures;
//!
//! let meta = fixtures::domain();
//! let (graph, posts) = fixtures::builders::post_chain(&["A", "B"]);
//! let batch = compile(&MappingContext::new(), &graph, &meta, &posts[..1], Depth::Unlimited).unwrap();
//! assert_eq!(batch.new_nodes.len(), 2);
//! ```

/// Mapped domain, graph builders and canned responses.
pub mod fixtures;

/// Scripted database connection.
pub mod request;

pub use fixtures::domain;
pub use request::ScriptedRequest;

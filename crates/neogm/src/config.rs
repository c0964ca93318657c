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

//! Configuration types for compiling, mapping and sessions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::Result;

/// Default maximum string length for property values: 100 MB.
///
/// For stricter limits use `CompilerConfig::for_untrusted_input()`, which
/// enforces 1 MB.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 100 * 1024 * 1024; // 100 MB

/// How many relationship hops a save or load traverses from its roots.
///
/// `Limited(0)` touches only the roots themselves. A chain of N objects
/// traversed with `Limited(k)` for `k < N` visits the first `k + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    /// Follow relationships until the reachable graph is exhausted.
    Unlimited,
    /// Follow at most this many hops.
    Limited(usize),
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Unlimited
    }
}

impl Depth {
    /// Whether no further hops are allowed.
    pub fn is_exhausted(self) -> bool {
        matches!(self, Depth::Limited(0))
    }

    /// The budget left after following one relationship.
    ///
    /// Saturates at `Limited(0)`.
    pub fn descend(self) -> Depth {
        match self {
            Depth::Unlimited => Depth::Unlimited,
            Depth::Limited(n) => Depth::Limited(n.saturating_sub(1)),
        }
    }

    /// Hop count for bounded depths, `None` when unlimited.
    pub fn hops(self) -> Option<usize> {
        match self {
            Depth::Unlimited => None,
            Depth::Limited(n) => Some(n),
        }
    }
}

impl PartialOrd for Depth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Depth {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Depth::Unlimited, Depth::Unlimited) => Ordering::Equal,
            (Depth::Unlimited, Depth::Limited(_)) => Ordering::Greater,
            (Depth::Limited(_), Depth::Unlimited) => Ordering::Less,
            (Depth::Limited(a), Depth::Limited(b)) => a.cmp(b),
        }
    }
}

impl From<usize> for Depth {
    fn from(hops: usize) -> Self {
        Depth::Limited(hops)
    }
}

/// Configuration for compiling object graphs into statement batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Maximum string length for property values (default: 100 MB).
    ///
    /// `None` disables the check.
    pub max_string_length: Option<usize>,

    /// Maximum number of nodes a single compilation may visit
    /// (default: None = unlimited).
    pub max_nodes: Option<usize>,

    /// Attach a descriptive comment to each clause (default: true).
    pub include_comments: bool,

    /// Append `RETURN id(var) AS var` for every new node and relationship to
    /// the combined statement (default: true).
    pub return_new_ids: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_string_length: Some(DEFAULT_MAX_STRING_LENGTH),
            max_nodes: None,
            include_comments: true,
            return_new_ids: true,
        }
    }
}

/// Builder for CompilerConfig.
///
/// # Examples
///
/// ```
/// # use neogm::CompilerConfig;
/// let config = CompilerConfig::builder()
///     .include_comments(false)
///     .max_nodes(10_000)
///     .build();
/// assert_eq!(config.max_nodes, Some(10_000));
/// ```
#[derive(Default)]
pub struct CompilerConfigBuilder {
    max_string_length: Option<Option<usize>>,
    max_nodes: Option<Option<usize>>,
    include_comments: Option<bool>,
    return_new_ids: Option<bool>,
}

impl CompilerConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum string length for property values.
    pub fn max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = Some(Some(max));
        self
    }

    /// Remove the string length limit.
    pub fn no_string_length_limit(mut self) -> Self {
        self.max_string_length = Some(None);
        self
    }

    /// Set maximum number of visited nodes.
    pub fn max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = Some(Some(max));
        self
    }

    /// Set whether clauses carry comments.
    pub fn include_comments(mut self, include: bool) -> Self {
        self.include_comments = Some(include);
        self
    }

    /// Set whether the combined statement returns new ids.
    pub fn return_new_ids(mut self, include: bool) -> Self {
        self.return_new_ids = Some(include);
        self
    }

    /// Build the CompilerConfig instance.
    ///
    /// All unset fields will use their default values.
    pub fn build(self) -> CompilerConfig {
        let defaults = CompilerConfig::default();
        CompilerConfig {
            max_string_length: self.max_string_length.unwrap_or(defaults.max_string_length),
            max_nodes: self.max_nodes.unwrap_or(defaults.max_nodes),
            include_comments: self.include_comments.unwrap_or(defaults.include_comments),
            return_new_ids: self.return_new_ids.unwrap_or(defaults.return_new_ids),
        }
    }
}

impl CompilerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for CompilerConfig.
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }

    /// Disable comments on clauses.
    pub fn without_comments(mut self) -> Self {
        self.include_comments = false;
        self
    }

    /// Do not append a `RETURN` projection to combined statements.
    pub fn without_returned_ids(mut self) -> Self {
        self.return_new_ids = false;
        self
    }

    /// Set maximum string length for property values.
    pub fn with_max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = Some(max);
        self
    }

    /// Remove string length limit (use with caution).
    pub fn without_string_length_limit(mut self) -> Self {
        self.max_string_length = None;
        self
    }

    /// Set maximum number of nodes to visit.
    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = Some(max);
        self
    }

    /// Create a configuration suitable for untrusted input.
    ///
    /// - 1MB max string length (vs 100MB default)
    /// - 100K max nodes
    /// - No comments
    pub fn for_untrusted_input() -> Self {
        Self {
            max_string_length: Some(1_000_000),
            max_nodes: Some(100_000),
            include_comments: false,
            ..Default::default()
        }
    }
}

/// Configuration for mapping query responses into entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Skip (and log) nodes whose labels match no mapped type instead of
    /// failing (default: true).
    pub skip_unknown_nodes: bool,

    /// Run post-load hooks after a response is mapped (default: true).
    pub run_post_load: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            skip_unknown_nodes: true,
            run_post_load: true,
        }
    }
}

impl MapperConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `UnknownLabels` on nodes that match no mapped type.
    pub fn strict(mut self) -> Self {
        self.skip_unknown_nodes = false;
        self
    }

    /// Do not run post-load hooks.
    pub fn without_post_load(mut self) -> Self {
        self.run_post_load = false;
        self
    }
}

/// Configuration for a [`Session`](crate::session::Session).
///
/// # Examples
///
/// ```
/// # use neogm::{Depth, SessionConfig};
/// let config = SessionConfig::from_json(r#"{"default_load_depth": {"limited": 2}}"#).unwrap();
/// assert_eq!(config.default_load_depth, Depth::Limited(2));
/// assert_eq!(config.default_save_depth, Depth::Unlimited);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Depth used by `save` (default: unlimited).
    pub default_save_depth: Depth,

    /// Depth used by `load` and `load_all` (default: 1).
    pub default_load_depth: Depth,

    /// Compiler settings.
    pub compiler: CompilerConfig,

    /// Mapper settings.
    pub mapper: MapperConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_save_depth: Depth::Unlimited,
            default_load_depth: Depth::Limited(1),
            compiler: CompilerConfig::default(),
            mapper: MapperConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the default save depth.
    pub fn with_save_depth(mut self, depth: Depth) -> Self {
        self.default_save_depth = depth;
        self
    }

    /// Set the default load depth.
    pub fn with_load_depth(mut self, depth: Depth) -> Self {
        self.default_load_depth = depth;
        self
    }

    /// Replace the compiler settings.
    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// Replace the mapper settings.
    pub fn with_mapper(mut self, mapper: MapperConfig) -> Self {
        self.mapper = mapper;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_ordering_and_descent() {
        assert!(Depth::Unlimited > Depth::Limited(usize::MAX));
        assert!(Depth::Limited(2) > Depth::Limited(1));
        assert_eq!(Depth::Limited(1).descend(), Depth::Limited(0));
        assert_eq!(Depth::Limited(0).descend(), Depth::Limited(0));
        assert_eq!(Depth::Unlimited.descend(), Depth::Unlimited);
        assert!(Depth::Limited(0).is_exhausted());
        assert!(!Depth::Unlimited.is_exhausted());
        assert_eq!(Depth::from(3).hops(), Some(3));
    }

    #[test]
    fn test_compiler_config_default() {
        let config = CompilerConfig::default();
        assert_eq!(config.max_string_length, Some(DEFAULT_MAX_STRING_LENGTH));
        assert_eq!(config.max_nodes, None);
        assert!(config.include_comments);
        assert!(config.return_new_ids);
    }

    #[test]
    fn test_compiler_config_fluent() {
        let config = CompilerConfig::new()
            .without_comments()
            .without_returned_ids()
            .with_max_nodes(5)
            .without_string_length_limit();
        assert!(!config.include_comments);
        assert!(!config.return_new_ids);
        assert_eq!(config.max_nodes, Some(5));
        assert_eq!(config.max_string_length, None);
    }

    #[test]
    fn test_compiler_config_builder() {
        let config = CompilerConfig::builder()
            .no_string_length_limit()
            .return_new_ids(false)
            .build();
        assert_eq!(config.max_string_length, None);
        assert!(!config.return_new_ids);
        assert!(config.include_comments);
    }

    #[test]
    fn test_untrusted_input() {
        let config = CompilerConfig::for_untrusted_input();
        assert_eq!(config.max_string_length, Some(1_000_000));
        assert_eq!(config.max_nodes, Some(100_000));
        assert!(!config.include_comments);
    }

    #[test]
    fn test_mapper_config() {
        let config = MapperConfig::default();
        assert!(config.skip_unknown_nodes);
        assert!(config.run_post_load);
        let strict = MapperConfig::new().strict().without_post_load();
        assert!(!strict.skip_unknown_nodes);
        assert!(!strict.run_post_load);
    }

    #[test]
    fn test_session_config_from_json() {
        let json = r#"{
            "default_save_depth": {"limited": 3},
            "compiler": {"include_comments": false},
            "mapper": {"skip_unknown_nodes": false}
        }"#;
        let config = SessionConfig::from_json(json).unwrap();
        assert_eq!(config.default_save_depth, Depth::Limited(3));
        assert_eq!(config.default_load_depth, Depth::Limited(1));
        assert!(!config.compiler.include_comments);
        assert!(config.compiler.return_new_ids);
        assert!(!config.mapper.skip_unknown_nodes);

        let unlimited = SessionConfig::from_json(r#"{"default_load_depth": "unlimited"}"#).unwrap();
        assert_eq!(unlimited.default_load_depth, Depth::Unlimited);
    }

    #[test]
    fn test_session_config_rejects_bad_json() {
        assert!(SessionConfig::from_json("{not json").is_err());
    }
}

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

//! A [`Request`] that answers from a script instead of a database.

use std::collections::VecDeque;

use neogm::response::{GraphModel, QueryStatistics, RowModel, RowValue, VecResponse};
use neogm::session::Request;
use neogm::{CypherStatement, CypherValue, MappingError, Result};

/// Scripted database connection.
///
/// Graph queries pop the next queued response. Writes answer their
/// `RETURN` projection with fresh ids counting up from
/// [`ScriptedRequest::first_id`]. Every executed statement is recorded.
#[derive(Debug, Clone)]
pub struct ScriptedRequest {
    graphs: VecDeque<Vec<GraphModel>>,
    rows: VecDeque<(Vec<String>, Vec<RowModel>)>,
    next_id: i64,
    fail_writes: bool,
    unmatched_writes: bool,
    /// Statements in execution order.
    pub executed: Vec<CypherStatement>,
}

impl Default for ScriptedRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRequest {
    /// Id handed to the first created entity.
    pub const FIRST_ID: i64 = 1000;

    /// Create a request with nothing queued.
    pub fn new() -> Self {
        Self {
            graphs: VecDeque::new(),
            rows: VecDeque::new(),
            next_id: Self::FIRST_ID,
            fail_writes: false,
            unmatched_writes: false,
            executed: Vec::new(),
        }
    }

    /// Id handed to the first created entity.
    pub fn first_id(&self) -> i64 {
        Self::FIRST_ID
    }

    /// Queue the graphs returned by the next graph query.
    pub fn with_graphs(mut self, graphs: Vec<GraphModel>) -> Self {
        self.graphs.push_back(graphs);
        self
    }

    /// Queue the rows returned by the next row query that has no `RETURN`
    /// projection of new ids.
    pub fn with_rows(mut self, columns: Vec<String>, rows: Vec<RowModel>) -> Self {
        self.rows.push_back((columns, rows));
        self
    }

    /// Make every write fail with a driver error.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Answer writes with no rows, as when a `MATCH` in the batch finds
    /// nothing.
    pub fn unmatched_writes(mut self) -> Self {
        self.unmatched_writes = true;
        self
    }

    /// Queue more graphs on an existing request.
    pub fn push_graphs(&mut self, graphs: Vec<GraphModel>) {
        self.graphs.push_back(graphs);
    }

    /// Last executed statement.
    pub fn last(&self) -> Option<&CypherStatement> {
        self.executed.last()
    }
}

/// Column aliases of a trailing `RETURN id(x) AS x, ...` line.
fn returned_columns(query: &str) -> Vec<String> {
    query
        .lines()
        .last()
        .and_then(|line| line.strip_prefix("RETURN "))
        .map(|projection| {
            projection
                .split(", ")
                .filter_map(|item| item.split_once(" AS "))
                .filter(|(expr, _)| expr.starts_with("id("))
                .map(|(_, alias)| alias.to_string())
                .collect()
        })
        .unwrap_or_default()
}

impl Request for ScriptedRequest {
    type Graphs = VecResponse<GraphModel>;
    type Rows = VecResponse<RowModel>;

    fn execute_graph(&mut self, statement: &CypherStatement) -> Result<Self::Graphs> {
        self.executed.push(statement.clone());
        Ok(VecResponse::from_items(
            self.graphs.pop_front().unwrap_or_default(),
        ))
    }

    fn execute_rows(&mut self, statement: &CypherStatement) -> Result<Self::Rows> {
        self.executed.push(statement.clone());
        let columns = returned_columns(&statement.query);
        if columns.is_empty() {
            let (columns, rows) = self.rows.pop_front().unwrap_or_default();
            return Ok(VecResponse::new(columns, rows));
        }
        if self.fail_writes {
            return Err(MappingError::Driver("write rejected".to_string()));
        }
        if self.unmatched_writes {
            return Ok(VecResponse::new(columns, Vec::new()));
        }
        let values = columns
            .iter()
            .map(|_| {
                let id = self.next_id;
                self.next_id += 1;
                RowValue::Scalar(CypherValue::Int(id))
            })
            .collect();
        Ok(VecResponse::new(columns, vec![RowModel::new(values)]))
    }

    fn execute_update(&mut self, statement: &CypherStatement) -> Result<QueryStatistics> {
        self.executed.push(statement.clone());
        if self.fail_writes {
            return Err(MappingError::Driver("write rejected".to_string()));
        }
        Ok(QueryStatistics {
            contains_updates: true,
            ..QueryStatistics::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returned_columns() {
        assert_eq!(
            returned_columns("CREATE (n0)\nRETURN id(n0) AS n0, id(r0) AS r0"),
            vec!["n0", "r0"]
        );
        assert!(returned_columns("MATCH (n) RETURN n").is_empty());
        assert!(returned_columns("MATCH (n)\nRETURN n.name AS name").is_empty());
    }

    #[test]
    fn test_ids_count_up() {
        let mut request = ScriptedRequest::new();
        let stmt = CypherStatement::query("CREATE (n0)\nRETURN id(n0) AS n0, id(n1) AS n1");
        let mut rows = request.execute_rows(&stmt).unwrap();
        let row = neogm::response::Response::next(&mut rows).unwrap();
        assert_eq!(row.values[1], RowValue::Scalar(CypherValue::Int(1001)));
    }
}

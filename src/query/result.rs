//! Query results as returned to callers

use super::executor::ExecutionResult;
use crate::graph::{Node, Relationship};
use serde::{Deserialize, Serialize};

/// Successful query outcome: a message plus the nodes and relationships it touched
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub message: String,
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl QueryResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_relationships(mut self, relationships: Vec<Relationship>) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// Wire form of a query outcome: `{message, nodes, relationships}` or `{error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Success(QueryResult),
    Error { error: String },
}

impl QueryResponse {
    pub fn error(message: impl Into<String>) -> Self {
        QueryResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResponse::Error { .. })
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            QueryResponse::Success(result) => Some(result),
            QueryResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            QueryResponse::Error { error } => Some(error),
            QueryResponse::Success(_) => None,
        }
    }
}

impl From<ExecutionResult<QueryResult>> for QueryResponse {
    fn from(outcome: ExecutionResult<QueryResult>) -> Self {
        match outcome {
            Ok(result) => QueryResponse::Success(result),
            Err(e) => QueryResponse::error(e.to_string()),
        }
    }
}

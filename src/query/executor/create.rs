//! CREATE handlers
//!
//! Node creation is find-or-create: a pattern whose label and properties are
//! already carried by a stored node reuses that node instead of adding a copy.

use super::{ExecutionResult, QueryExecutor};
use crate::graph::{Node, PropertyMap, RelType, Relationship};
use crate::lock::{INDEXES, NODES, RELATIONSHIPS};
use crate::query::ast::{CreateClause, CreateNode};
use crate::query::result::QueryResult;
use tracing::debug;

impl QueryExecutor<'_> {
    pub(super) fn execute_create(&self, clause: &CreateClause) -> ExecutionResult<QueryResult> {
        match clause {
            CreateClause::Nodes(patterns) => self.create_nodes(patterns),
            CreateClause::Relationship {
                start,
                rel_type,
                properties,
                end,
            } => self.create_relationship(start, rel_type, properties, end),
        }
    }

    fn create_nodes(&self, patterns: &[CreateNode]) -> ExecutionResult<QueryResult> {
        let _guards = self.locks.acquire_collections(&[NODES, INDEXES]);
        let mut nodes = self.storage.load_nodes()?;
        let mut created = Vec::new();

        for pattern in patterns {
            if find_node(&nodes, pattern).is_some() {
                continue;
            }
            let node = Node::with_properties(pattern.label.clone(), pattern.properties.clone());
            nodes.push(node.clone());
            created.push(node);
        }

        if !created.is_empty() {
            self.storage.save_nodes(&nodes)?;
            self.maintain_indexes(&created)?;
        }
        debug!("CREATE added {} of {} node patterns", created.len(), patterns.len());

        Ok(QueryResult::new("Node(s) created").with_nodes(created))
    }

    fn create_relationship(
        &self,
        start: &CreateNode,
        rel_type: &RelType,
        properties: &PropertyMap,
        end: &CreateNode,
    ) -> ExecutionResult<QueryResult> {
        let _guards = self.locks.acquire_collections(&[NODES, RELATIONSHIPS, INDEXES]);
        let mut nodes = self.storage.load_nodes()?;
        let mut relationships = self.storage.load_relationships()?;
        let mut created = Vec::new();

        let start_node = find_or_create(&mut nodes, &mut created, start);
        let end_node = find_or_create(&mut nodes, &mut created, end);

        let rel = Relationship::with_properties(
            start_node.id.clone(),
            end_node.id.clone(),
            rel_type.clone(),
            properties.clone(),
        );
        relationships.push(rel.clone());

        if !created.is_empty() {
            self.storage.save_nodes(&nodes)?;
        }
        self.storage.save_relationships(&relationships)?;
        self.maintain_indexes(&created)?;

        Ok(QueryResult::new("Nodes and relationship created")
            .with_nodes(vec![start_node, end_node])
            .with_relationships(vec![rel]))
    }

    fn maintain_indexes(&self, created: &[Node]) -> ExecutionResult<()> {
        if self.maintain_indexes {
            self.indexes.index_nodes(created)?;
        }
        Ok(())
    }
}

/// First stored node carrying the pattern's label and every one of its properties
fn find_node<'n>(nodes: &'n [Node], pattern: &CreateNode) -> Option<&'n Node> {
    nodes
        .iter()
        .find(|node| node.matches(Some(&pattern.label), &pattern.properties))
}

fn find_or_create(nodes: &mut Vec<Node>, created: &mut Vec<Node>, pattern: &CreateNode) -> Node {
    if let Some(existing) = find_node(nodes, pattern) {
        return existing.clone();
    }
    let node = Node::with_properties(pattern.label.clone(), pattern.properties.clone());
    nodes.push(node.clone());
    created.push(node.clone());
    node
}

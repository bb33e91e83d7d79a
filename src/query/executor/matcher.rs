//! MATCH handlers
//!
//! Reads never take locks: collection files are replaced atomically, so each
//! load observes a complete collection.

use super::{ExecutionError, ExecutionResult, QueryExecutor};
use crate::graph::{Node, NodeId, Relationship};
use crate::query::ast::{Comparison, Direction, MatchClause, NodePattern, PathSegment};
use crate::query::result::QueryResult;
use std::collections::{HashMap, HashSet};
use tracing::debug;

impl QueryExecutor<'_> {
    pub(super) fn execute_match(
        &self,
        clause: &MatchClause,
        use_index: bool,
    ) -> ExecutionResult<QueryResult> {
        if let Some(cmp) = &clause.where_clause {
            if !clause.pattern.binds(&cmp.variable) {
                return Err(ExecutionError::VariableMismatch);
            }
        }

        let start = &clause.pattern.start;
        match &clause.pattern.segment {
            Some(segment) => self.match_relationships(start, segment, clause.where_clause.as_ref()),
            None => match &clause.where_clause {
                Some(cmp) => self.match_where(start, cmp),
                None if start.label.is_none() && start.properties.is_empty() => self.match_all(),
                None if !start.properties.is_empty() => self.match_properties(start, use_index),
                None => self.match_label(start),
            },
        }
    }

    fn match_all(&self) -> ExecutionResult<QueryResult> {
        let nodes = self.storage.load_nodes()?;
        let relationships = self.storage.load_relationships()?;
        Ok(QueryResult::new(format!(
            "{} nodes and {} relationships returned",
            nodes.len(),
            relationships.len()
        ))
        .with_nodes(nodes)
        .with_relationships(relationships))
    }

    fn match_label(&self, pattern: &NodePattern) -> ExecutionResult<QueryResult> {
        let matched = self.scan(pattern)?;
        Ok(QueryResult::new(format!("{} nodes matched", matched.len())).with_nodes(matched))
    }

    fn match_where(&self, pattern: &NodePattern, cmp: &Comparison) -> ExecutionResult<QueryResult> {
        let matched: Vec<Node> = self
            .scan(pattern)?
            .into_iter()
            .filter(|node| cmp.evaluate(node.get_property(&cmp.property)))
            .collect();
        Ok(
            QueryResult::new(format!("{} nodes matched with WHERE", matched.len()))
                .with_nodes(matched),
        )
    }

    fn match_properties(
        &self,
        pattern: &NodePattern,
        use_index: bool,
    ) -> ExecutionResult<QueryResult> {
        let probed = match (&pattern.label, pattern.properties.first()) {
            (Some(label), Some((prop, value))) if use_index && pattern.properties.len() == 1 => {
                self.indexes.find_nodes(label, prop, value)
            }
            _ => Vec::new(),
        };

        let matched = if probed.is_empty() {
            self.scan(pattern)?
        } else {
            debug!("Index probe returned {} candidates", probed.len());
            let ids: HashSet<&NodeId> = probed.iter().collect();
            self.storage
                .load_nodes()?
                .into_iter()
                .filter(|node| ids.contains(&node.id))
                .filter(|node| node.matches(pattern.label.as_ref(), &pattern.properties))
                .collect()
        };

        Ok(
            QueryResult::new(format!("{} nodes matched with properties", matched.len()))
                .with_nodes(matched),
        )
    }

    fn match_relationships(
        &self,
        start: &NodePattern,
        segment: &PathSegment,
        cmp: Option<&Comparison>,
    ) -> ExecutionResult<QueryResult> {
        let nodes = self.storage.load_nodes()?;
        let relationships = self.storage.load_relationships()?;
        let by_id: HashMap<&NodeId, &Node> = nodes.iter().map(|n| (&n.id, n)).collect();

        let rel_pattern = &segment.relationship;
        let end = &segment.end;
        let mut matched_nodes: Vec<Node> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut matched_rels = Vec::new();

        for rel in &relationships {
            if !rel.matches(rel_pattern.rel_type.as_ref(), &rel_pattern.properties) {
                continue;
            }
            // Relationships pointing at missing nodes are skipped
            let (Some(&from), Some(&to)) = (by_id.get(&rel.start_node), by_id.get(&rel.end_node))
            else {
                continue;
            };

            let binds = |left: &Node, right: &Node| {
                left.matches(start.label.as_ref(), &start.properties)
                    && right.matches(end.label.as_ref(), &end.properties)
                    && cmp.map_or(true, |cmp| {
                        evaluate_binding(cmp, start, left, end, right, segment, rel)
                    })
            };
            let hit = match rel_pattern.direction {
                Direction::Outgoing => binds(from, to),
                Direction::Incoming => binds(to, from),
                Direction::Undirected => binds(from, to) || binds(to, from),
            };
            if !hit {
                continue;
            }

            for node in [from, to] {
                if seen.insert(node.id.clone()) {
                    matched_nodes.push(node.clone());
                }
            }
            matched_rels.push(rel.clone());
        }

        Ok(QueryResult::new(format!(
            "{} {} relationship(s) matched",
            matched_rels.len(),
            rel_pattern.direction.as_str()
        ))
        .with_nodes(matched_nodes)
        .with_relationships(matched_rels))
    }

    /// Nodes satisfying a node pattern's label and properties, in stored order
    fn scan(&self, pattern: &NodePattern) -> ExecutionResult<Vec<Node>> {
        Ok(self
            .storage
            .load_nodes()?
            .into_iter()
            .filter(|node| node.matches(pattern.label.as_ref(), &pattern.properties))
            .collect())
    }
}

/// Evaluate a WHERE comparison against whichever entity its variable names
fn evaluate_binding(
    cmp: &Comparison,
    start: &NodePattern,
    left: &Node,
    end: &NodePattern,
    right: &Node,
    segment: &PathSegment,
    rel: &Relationship,
) -> bool {
    if start.binds(&cmp.variable) {
        cmp.evaluate(left.get_property(&cmp.property))
    } else if end.binds(&cmp.variable) {
        cmp.evaluate(right.get_property(&cmp.property))
    } else if segment.relationship.variable.as_deref() == Some(cmp.variable.as_str()) {
        cmp.evaluate(rel.get_property(&cmp.property))
    } else {
        false
    }
}

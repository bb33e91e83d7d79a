//! Typed statements produced by the parser

use crate::graph::{Label, PropertyMap, PropertyValue, RelType};
use std::cmp::Ordering;
use std::fmt;

/// One parsed query
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `CREATE INDEX ON :Label(prop)`
    CreateIndex(CreateIndexClause),
    /// `CREATE (...)` or `CREATE (...)-[...]->(...)`
    Create(CreateClause),
    /// `MATCH ... [WHERE ...] RETURN ...`
    Match(MatchClause),
}

/// CREATE INDEX clause
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexClause {
    pub label: Label,
    pub property: String,
}

/// CREATE clause
#[derive(Debug, Clone, PartialEq)]
pub enum CreateClause {
    /// One or more standalone nodes
    Nodes(Vec<CreateNode>),
    /// Two endpoints joined by a relationship, already oriented start -> end
    Relationship {
        start: CreateNode,
        rel_type: RelType,
        properties: PropertyMap,
        end: CreateNode,
    },
}

/// Node written by CREATE; unlike a match pattern it always has a label
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNode {
    pub label: Label,
    pub properties: PropertyMap,
}

impl CreateNode {
    /// `None` for an unlabeled pattern
    pub fn from_pattern(pattern: NodePattern) -> Option<Self> {
        Some(Self {
            label: pattern.label?,
            properties: pattern.properties,
        })
    }
}

/// Node pattern: (variable:Label {props})
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub label: Option<Label>,
    pub properties: PropertyMap,
}

impl NodePattern {
    pub fn binds(&self, variable: &str) -> bool {
        self.variable.as_deref() == Some(variable)
    }
}

/// Relationship direction, read left to right in the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(a)-[]->(b)`
    Outgoing,
    /// `(a)<-[]-(b)`
    Incoming,
    /// `(a)-[]-(b)`
    Undirected,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "directed",
            Direction::Incoming => "bidirectional",
            Direction::Undirected => "undirected",
        }
    }
}

/// Relationship pattern: -[variable:TYPE {props}]->
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_type: Option<RelType>,
    pub properties: PropertyMap,
    pub direction: Direction,
}

/// Relationship hop and its far endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub relationship: RelationshipPattern,
    pub end: NodePattern,
}

/// A single node, optionally followed by one hop
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub segment: Option<PathSegment>,
}

impl PathPattern {
    /// True when some node or relationship in the pattern binds `variable`
    pub fn binds(&self, variable: &str) -> bool {
        self.start.binds(variable)
            || self.segment.as_ref().is_some_and(|seg| {
                seg.end.binds(variable) || seg.relationship.variable.as_deref() == Some(variable)
            })
    }
}

/// MATCH clause
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub pattern: PathPattern,
    pub where_clause: Option<Comparison>,
    pub return_variables: Vec<String>,
}

/// WHERE predicate: variable.property OP literal
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub variable: String,
    pub property: String,
    pub operator: CompareOp,
    pub value: PropertyValue,
}

impl Comparison {
    /// Evaluate against a property value; absent or incomparable values never match
    pub fn evaluate(&self, actual: Option<&PropertyValue>) -> bool {
        actual
            .and_then(|value| value.compare(&self.value))
            .is_some_and(|ordering| self.operator.accepts(ordering))
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            ">" => Some(CompareOp::Gt),
            "<=" => Some(CompareOp::Le),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

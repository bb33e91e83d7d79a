//! Cypher subset parser using Pest
//!
//! The leading keyword picks the grammar entry point (`CREATE INDEX`, `CREATE`
//! or `MATCH`), so a syntax error can be reported against the statement kind
//! the caller was attempting.

use super::ast::*;
use super::literal::{parse_literal, unquote};
use crate::graph::{Label, PropertyMap, RelType};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;
use tracing::debug;

#[derive(Parser)]
#[grammar = "query/cypher.pest"]
struct CypherParser;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Query does not start with a supported keyword
    #[error("Unsupported query type")]
    UnsupportedQuery,

    #[error("Invalid MATCH syntax")]
    InvalidMatch,

    #[error("Invalid CREATE syntax")]
    InvalidCreate,

    #[error("Invalid CREATE with relationship syntax")]
    InvalidCreateRelationship,

    #[error("Invalid CREATE INDEX syntax")]
    InvalidCreateIndex,

    /// WHERE operator outside =, !=, <, >, <=, >=
    #[error("Unsupported operator in WHERE clause: {0}")]
    UnsupportedOperator(String),

    /// Malformed standalone property list
    #[error("Invalid property list: {0}")]
    InvalidProperties(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse one query string into a typed statement
pub fn parse_statement(input: &str) -> ParseResult<Statement> {
    let query = input.trim();

    if let Some(rest) = query.strip_prefix("CREATE") {
        if rest.trim_start().starts_with("INDEX") {
            return parse_create_index(query);
        }
        return parse_create(query);
    }
    if query.starts_with("MATCH") {
        return parse_match(query);
    }
    Err(ParseError::UnsupportedQuery)
}

/// Parse the inside of a property block: `key: value, key: value`
pub fn parse_properties(text: &str) -> ParseResult<PropertyMap> {
    let mut pairs = CypherParser::parse(Rule::property_text, text).map_err(|e| {
        debug!("Property list rejected: {}", e);
        ParseError::InvalidProperties(text.to_string())
    })?;

    let mut properties = PropertyMap::new();
    if let Some(list) = pairs.next() {
        collect_properties(list, &mut properties);
    }
    Ok(properties)
}

fn parse_create_index(query: &str) -> ParseResult<Statement> {
    let pairs = CypherParser::parse(Rule::create_index_query, query).map_err(|e| {
        debug!("CREATE INDEX rejected: {}", e);
        ParseError::InvalidCreateIndex
    })?;

    let mut label = None;
    let mut property = None;
    let mut variables = Vec::new();

    for pair in pairs.flatten() {
        match pair.as_rule() {
            Rule::label => label = Some(Label::new(pair.as_str())),
            Rule::property_name => property = Some(pair.as_str().to_string()),
            Rule::variable => variables.push(pair.as_str().to_string()),
            _ => {}
        }
    }

    // FOR (n:Label) ON (n.prop) must refer to the same variable twice
    if variables.len() == 2 && variables[0] != variables[1] {
        return Err(ParseError::InvalidCreateIndex);
    }

    match (label, property) {
        (Some(label), Some(property)) => {
            Ok(Statement::CreateIndex(CreateIndexClause { label, property }))
        }
        _ => Err(ParseError::InvalidCreateIndex),
    }
}

fn parse_create(query: &str) -> ParseResult<Statement> {
    let pairs = CypherParser::parse(Rule::create_query, query).map_err(|e| {
        debug!("CREATE rejected: {}", e);
        if looks_like_relationship(query) {
            ParseError::InvalidCreateRelationship
        } else {
            ParseError::InvalidCreate
        }
    })?;

    for pair in pairs.flatten() {
        match pair.as_rule() {
            Rule::create_path => return parse_create_path(pair),
            Rule::create_nodes => {
                let nodes = pair
                    .into_inner()
                    .map(|p| CreateNode::from_pattern(parse_node_pattern(p)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ParseError::InvalidCreate)?;
                return Ok(Statement::Create(CreateClause::Nodes(nodes)));
            }
            _ => {}
        }
    }
    Err(ParseError::InvalidCreate)
}

fn looks_like_relationship(query: &str) -> bool {
    query.contains("-[") || query.contains("]-") || query.contains("->") || query.contains("<-")
}

fn parse_create_path(pair: Pair<Rule>) -> ParseResult<Statement> {
    let mut inner = pair.into_inner();
    let (Some(left), Some(rel), Some(right)) = (inner.next(), inner.next(), inner.next()) else {
        return Err(ParseError::InvalidCreateRelationship);
    };
    let left = parse_node_pattern(left);
    let relationship = parse_relationship(rel);
    let right = parse_node_pattern(right);

    let (start, end) = match relationship.direction {
        Direction::Outgoing => (left, right),
        Direction::Incoming => (right, left),
        Direction::Undirected => return Err(ParseError::InvalidCreateRelationship),
    };

    let (Some(start), Some(end), Some(rel_type)) = (
        CreateNode::from_pattern(start),
        CreateNode::from_pattern(end),
        relationship.rel_type,
    ) else {
        return Err(ParseError::InvalidCreateRelationship);
    };

    Ok(Statement::Create(CreateClause::Relationship {
        start,
        rel_type,
        properties: relationship.properties,
        end,
    }))
}

fn parse_match(query: &str) -> ParseResult<Statement> {
    let pairs = CypherParser::parse(Rule::match_query, query).map_err(|e| {
        debug!("MATCH rejected: {}", e);
        ParseError::InvalidMatch
    })?;

    let mut pattern = None;
    let mut where_clause = None;
    let mut return_variables = Vec::new();

    for pair in pairs.flatten() {
        match pair.as_rule() {
            Rule::path_pattern => pattern = Some(parse_path_pattern(pair)),
            Rule::where_clause => where_clause = Some(parse_where(pair)?),
            Rule::return_clause => {
                return_variables = pair
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::variable)
                    .map(|p| p.as_str().to_string())
                    .collect();
            }
            _ => {}
        }
    }

    let pattern = pattern.ok_or(ParseError::InvalidMatch)?;
    Ok(Statement::Match(MatchClause {
        pattern,
        where_clause,
        return_variables,
    }))
}

fn parse_path_pattern(pair: Pair<Rule>) -> PathPattern {
    let mut inner = pair.into_inner();
    let start = inner.next().map(parse_node_pattern).unwrap_or_default();
    let segment = match (inner.next(), inner.next()) {
        (Some(rel), Some(end)) => Some(PathSegment {
            relationship: parse_relationship(rel),
            end: parse_node_pattern(end),
        }),
        _ => None,
    };
    PathPattern { start, segment }
}

fn parse_where(pair: Pair<Rule>) -> ParseResult<Comparison> {
    let mut variable = String::new();
    let mut property = String::new();
    let mut operator = None;
    let mut value = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::property_ref => {
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::variable => variable = part.as_str().to_string(),
                        Rule::property_name => property = part.as_str().to_string(),
                        _ => {}
                    }
                }
            }
            Rule::comparison_op => {
                let op = inner.as_str();
                operator = Some(
                    CompareOp::parse(op)
                        .ok_or_else(|| ParseError::UnsupportedOperator(op.to_string()))?,
                );
            }
            Rule::literal => value = Some(parse_literal(inner.as_str())),
            _ => {}
        }
    }

    match (operator, value) {
        (Some(operator), Some(value)) => Ok(Comparison {
            variable,
            property,
            operator,
            value,
        }),
        _ => Err(ParseError::InvalidMatch),
    }
}

fn parse_node_pattern(pair: Pair<Rule>) -> NodePattern {
    let mut node = NodePattern::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => node.variable = Some(inner.as_str().to_string()),
            Rule::label => node.label = Some(Label::new(inner.as_str())),
            Rule::properties => collect_properties(inner, &mut node.properties),
            _ => {}
        }
    }
    node
}

fn parse_relationship(pair: Pair<Rule>) -> RelationshipPattern {
    let mut rel = RelationshipPattern {
        variable: None,
        rel_type: None,
        properties: PropertyMap::new(),
        direction: Direction::Outgoing,
    };

    let Some(shape) = pair.into_inner().next() else {
        return rel;
    };
    rel.direction = match shape.as_rule() {
        Rule::incoming_rel => Direction::Incoming,
        Rule::undirected_rel => Direction::Undirected,
        _ => Direction::Outgoing,
    };

    for detail in shape.into_inner().flat_map(|d| d.into_inner()) {
        match detail.as_rule() {
            Rule::variable => rel.variable = Some(detail.as_str().to_string()),
            Rule::rel_type => rel.rel_type = Some(RelType::new(detail.as_str())),
            Rule::properties => collect_properties(detail, &mut rel.properties),
            _ => {}
        }
    }
    rel
}

fn collect_properties(pair: Pair<Rule>, properties: &mut PropertyMap) {
    for property in pair.into_inner().filter(|p| p.as_rule() == Rule::property) {
        let mut parts = property.into_inner();
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            properties.insert(unquote(key.as_str()).to_string(), parse_literal(value.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    fn match_clause(query: &str) -> MatchClause {
        match parse_statement(query).unwrap() {
            Statement::Match(m) => m,
            other => panic!("expected MATCH, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_single_node() {
        let stmt = parse_statement(r#"CREATE (a:Person {name: "Alice", age: 30})"#).unwrap();
        let Statement::Create(CreateClause::Nodes(nodes)) = stmt else {
            panic!("expected node create");
        };
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].label, Label::new("Person"));
        assert_eq!(nodes[0].properties["name"], PropertyValue::from("Alice"));
        assert_eq!(nodes[0].properties["age"], PropertyValue::Integer(30));
    }

    #[test]
    fn test_parse_create_multiple_nodes() {
        let stmt =
            parse_statement(r#"CREATE (a:Person {name: "Alice"}), (c:City {name: 'Paris'})"#)
                .unwrap();
        let Statement::Create(CreateClause::Nodes(nodes)) = stmt else {
            panic!("expected node create");
        };
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].label, Label::new("City"));
    }

    #[test]
    fn test_parse_create_relationship() {
        let stmt = parse_statement(
            r#"CREATE (a:Person {name: "Alice"})-[:KNOWS {since: 2020}]->(b:Person {name: "Bob"})"#,
        )
        .unwrap();
        let Statement::Create(CreateClause::Relationship {
            start,
            rel_type,
            properties,
            end,
        }) = stmt
        else {
            panic!("expected relationship create");
        };
        assert_eq!(start.properties["name"], PropertyValue::from("Alice"));
        assert_eq!(end.properties["name"], PropertyValue::from("Bob"));
        assert_eq!(rel_type, RelType::new("KNOWS"));
        assert_eq!(properties["since"], PropertyValue::Integer(2020));
    }

    #[test]
    fn test_incoming_create_swaps_endpoints() {
        let stmt = parse_statement("CREATE (a:Person)<-[:OWNS]-(b:Company)").unwrap();
        let Statement::Create(CreateClause::Relationship { start, end, .. }) = stmt else {
            panic!("expected relationship create");
        };
        assert_eq!(start.label, Label::new("Company"));
        assert_eq!(end.label, Label::new("Person"));
    }

    #[test]
    fn test_create_errors() {
        assert_eq!(
            parse_statement("CREATE (a:Person)-[:KNOWS]-(b:Person)"),
            Err(ParseError::InvalidCreateRelationship)
        );
        assert_eq!(
            parse_statement("CREATE (a:Person)-[:KNOWS->(b:Person)"),
            Err(ParseError::InvalidCreateRelationship)
        );
        assert_eq!(
            parse_statement("CREATE (a:Person)-[]->(b:Person)"),
            Err(ParseError::InvalidCreateRelationship)
        );
        assert_eq!(
            parse_statement("CREATE (a)-[:KNOWS]->(b:Person)"),
            Err(ParseError::InvalidCreateRelationship)
        );
        assert_eq!(parse_statement("CREATE (a {name: 1})"), Err(ParseError::InvalidCreate));
        assert_eq!(parse_statement("CREATE a:Person"), Err(ParseError::InvalidCreate));
    }

    #[test]
    fn test_parse_create_index_forms() {
        let expected = Statement::CreateIndex(CreateIndexClause {
            label: Label::new("Person"),
            property: "name".to_string(),
        });
        assert_eq!(parse_statement("CREATE INDEX ON :Person(name)").unwrap(), expected);
        assert_eq!(
            parse_statement("CREATE INDEX FOR (n:Person) ON (n.name)").unwrap(),
            expected
        );
        assert_eq!(
            parse_statement("CREATE INDEX FOR (n:Person) ON (m.name)"),
            Err(ParseError::InvalidCreateIndex)
        );
        assert_eq!(parse_statement("CREATE INDEX Person"), Err(ParseError::InvalidCreateIndex));
    }

    #[test]
    fn test_parse_match_shapes() {
        let m = match_clause("MATCH (n:Person) RETURN n");
        assert_eq!(m.pattern.start.label, Some(Label::new("Person")));
        assert!(m.pattern.segment.is_none());
        assert_eq!(m.return_variables, vec!["n"]);

        let m = match_clause(r#"MATCH (n:Person {name: "Alice"}) RETURN n"#);
        assert_eq!(m.pattern.start.properties.len(), 1);

        let m = match_clause("MATCH (n) RETURN n");
        assert!(m.pattern.start.label.is_none());
    }

    #[test]
    fn test_parse_match_directions() {
        for (query, direction) in [
            ("MATCH (a:P)-[:T]->(b:Q) RETURN a, b", Direction::Outgoing),
            ("MATCH (a:P)<-[:T]-(b:Q) RETURN a, b", Direction::Incoming),
            ("MATCH (a:P)-[:T]-(b:Q) RETURN a, b", Direction::Undirected),
        ] {
            let m = match_clause(query);
            let segment = m.pattern.segment.unwrap();
            assert_eq!(segment.relationship.direction, direction, "{}", query);
            assert_eq!(segment.relationship.rel_type, Some(RelType::new("T")));
            assert_eq!(segment.end.label, Some(Label::new("Q")));
            assert_eq!(m.return_variables, vec!["a", "b"]);
        }
    }

    #[test]
    fn test_parse_where() {
        let m = match_clause("MATCH (n:Person) WHERE n.age >= 30 RETURN n");
        let cmp = m.where_clause.unwrap();
        assert_eq!(cmp.variable, "n");
        assert_eq!(cmp.property, "age");
        assert_eq!(cmp.operator, CompareOp::Ge);
        assert_eq!(cmp.value, PropertyValue::Integer(30));

        let m = match_clause(r#"MATCH (n:Person) WHERE n.name = "Alice" RETURN n"#);
        assert_eq!(m.where_clause.unwrap().value, PropertyValue::from("Alice"));
    }

    #[test]
    fn test_unsupported_operator() {
        assert_eq!(
            parse_statement("MATCH (n:Person) WHERE n.age <> 30 RETURN n"),
            Err(ParseError::UnsupportedOperator("<>".to_string()))
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            parse_statement("match (n:Person) return n"),
            Err(ParseError::UnsupportedQuery)
        );
        assert_eq!(
            parse_statement("create (n:Person)"),
            Err(ParseError::UnsupportedQuery)
        );
        assert_eq!(
            parse_statement("MATCH (n:Person) return n"),
            Err(ParseError::InvalidMatch)
        );
        assert_eq!(parse_statement("DELETE n"), Err(ParseError::UnsupportedQuery));
    }

    #[test]
    fn test_parse_properties_text() {
        let props = parse_properties(r#"name: "Smith, John", 'role': admin, score: 9.5"#).unwrap();
        assert_eq!(props["name"], PropertyValue::from("Smith, John"));
        assert_eq!(props["role"], PropertyValue::from("admin"));
        assert_eq!(props["score"], PropertyValue::Float(9.5));

        assert!(parse_properties("").unwrap().is_empty());
        assert!(parse_properties("no colon here").is_err());
    }
}

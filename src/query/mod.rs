//! Query processing
//!
//! - `cypher.pest` + `parser`: recognizes CREATE INDEX, CREATE and MATCH statements
//! - `ast`: the typed statements the parser produces
//! - `literal`: typing of property literals
//! - `executor`: runs statements against a database directory
//! - `result`: result and wire response types

pub mod ast;
pub mod executor;
pub mod literal;
pub mod parser;
pub mod result;

// Re-export main types
pub use ast::Statement;
pub use executor::{ExecutionError, ExecutionResult, QueryExecutor};
pub use literal::parse_literal;
pub use parser::{parse_properties, parse_statement, ParseError, ParseResult};
pub use result::{QueryResponse, QueryResult};

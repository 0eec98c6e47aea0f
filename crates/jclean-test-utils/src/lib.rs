//! Utilities shared by jclean tests.
//!
//! The cleanup engine consumes an AST and a type oracle produced by a host
//! parser. Tests drive it from Java text instead, through [`FixtureFrontend`]:
//! a recursive-descent parser for the Java subset the fixtures use, plus a
//! scope-based resolver that answers [`jclean_ast::TypeOracle`] queries for
//! locals, fields, own methods and a small slice of the JDK.

mod fixtures;
mod lexer;
mod library;
mod oracle;
mod parser;

pub use fixtures::{extract_range, find_node, node_with_range};
pub use oracle::FixtureOracle;

use jclean_ast::{FrontendError, JavaFrontend, ParsedUnit};

/// [`JavaFrontend`] over the fixture parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureFrontend;

impl JavaFrontend for FixtureFrontend {
    fn parse(&self, source: &str) -> Result<ParsedUnit, FrontendError> {
        let output = parser::parse_java(source)?;
        let oracle = oracle::resolve(&output.ast, source, &output.headers);
        tracing::trace!(
            target: "jclean.fixture",
            nodes = output.ast.len(),
            comments = output.ast.comments().len(),
            "parsed fixture"
        );
        Ok(ParsedUnit::new(output.ast, oracle))
    }
}

/// Parses a fixture, panicking with the offset on failure.
pub fn parse_fixture(source: &str) -> ParsedUnit {
    FixtureFrontend
        .parse(source)
        .unwrap_or_else(|err| panic!("fixture does not parse: {err}\n{source}"))
}

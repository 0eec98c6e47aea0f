use thiserror::Error;

use crate::{Ast, TypeOracle};

/// A parsed compilation unit together with its semantic oracle.
pub struct ParsedUnit {
    pub ast: Ast,
    pub oracle: Box<dyn TypeOracle>,
}

impl ParsedUnit {
    pub fn new(ast: Ast, oracle: impl TypeOracle + 'static) -> Self {
        Self {
            ast,
            oracle: Box::new(oracle),
        }
    }
}

impl std::fmt::Debug for ParsedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedUnit")
            .field("nodes", &self.ast.len())
            .field("comments", &self.ast.comments().len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrontendError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("unsupported construct at offset {offset}: {what}")]
    Unsupported { offset: usize, what: String },
}

/// Parser and binding resolver supplied by the host.
pub trait JavaFrontend {
    fn parse(&self, source: &str) -> Result<ParsedUnit, FrontendError>;
}

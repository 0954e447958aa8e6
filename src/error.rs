use thiserror::Error;

use crate::dialect::Dialect;

/// The snippet ran, but the graph it describes cannot be placed in the editor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("no {0} found in the code")]
    NoGraph(&'static str),
    #[error("the graph has no nodes")]
    NoNodes,
    #[error("layout has {positions} positions but the graph has {vertices} vertices")]
    LayoutMismatch { positions: usize, vertices: usize },
    #[error("node {0} is missing position data (x, y)")]
    MissingPosition(String),
    #[error("node {node} has an invalid position `{value}`")]
    InvalidPosition { node: String, value: String },
    #[error("more than one node is named {0}")]
    DuplicateNode(String),
    #[error("edge references unknown endpoints: {from} -> {to}")]
    UnknownEndpoint { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("{dialect} import is not available: {reason}")]
    UnavailableDialect { dialect: Dialect, reason: String },
    #[error("no supported graph library found in code. Supported libraries: {supported}")]
    UnknownDialect { supported: String },
    #[error("error executing code: {0}")]
    Execution(String),
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

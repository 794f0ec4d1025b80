pub mod block;
pub mod config;
pub mod element;
pub mod parser;
pub mod text;

use crate::element::Element;

/// A parsed NEPO program document.
#[derive(Debug, Clone)]
pub struct ProgramTree {
    /// Root element of the document; everything below it materializes
    /// lazily on first access.
    pub root: Element,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

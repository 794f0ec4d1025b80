use std::fmt;

use crate::ProgramTree;
use crate::element::Element;

/// Block type of the unique program entry point.
pub const START_BLOCK_TYPE: &str = "robControls_start";

/// A typed view over an element tagged `block`.
///
/// A block's `type` attribute selects interpreter behavior; its slots
/// are child elements: `next` (sequencing), `statement name="X"`
/// (nested block sequences), `value name="X"` (single nested expression
/// block), `field name="X"` (inline literal text). Missing slots yield
/// None; handlers substitute their defined defaults.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    el: &'a Element,
}

impl<'a> Block<'a> {
    pub fn from_element(el: &'a Element) -> Option<Self> {
        (el.tag_name() == "block").then_some(Block { el })
    }

    pub fn element(&self) -> &'a Element {
        self.el
    }

    /// The `type` attribute. Empty when absent.
    pub fn block_type(&self) -> &'a str {
        self.el
            .attribute("type")
            .map(|v| v.as_str())
            .unwrap_or("")
    }

    /// The block chained after this one.
    pub fn next(&self) -> Option<Block<'a>> {
        first_block(self.el.child_tagged("next")?)
    }

    /// The first block of the named statement slot.
    pub fn statement(&self, name: &str) -> Option<Block<'a>> {
        first_block(self.named_child("statement", name)?)
    }

    /// The nested expression block of the named value slot.
    pub fn value(&self, name: &str) -> Option<Block<'a>> {
        first_block(self.named_child("value", name)?)
    }

    /// The literal text of the named field slot.
    pub fn field(&self, name: &str) -> Option<&'a str> {
        self.named_child("field", name)?.text()
    }

    fn named_child(&self, tag: &str, name: &str) -> Option<&'a Element> {
        self.el.children().iter().find(|c| {
            c.tag_name() == tag && c.attribute("name").is_some_and(|n| n == name)
        })
    }
}

fn first_block(el: &Element) -> Option<Block<'_>> {
    el.children().iter().find_map(Block::from_element)
}

/// Raised when a program document is missing its required entry block.
#[derive(Debug)]
pub enum StructureError {
    NoStartBlock,
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::NoStartBlock => {
                write!(f, "program has no {} block", START_BLOCK_TYPE)
            }
        }
    }
}

impl std::error::Error for StructureError {}

/// Locate the program entry block: root → optional wrapper →
/// `block_set` → `instance` → top-level blocks, exactly one of which
/// should be the start block. Returns the first start block found plus
/// the count of extra ones (the caller reports duplicates).
pub fn find_start_block(tree: &ProgramTree) -> Result<(Block<'_>, usize), StructureError> {
    let mut starts = Vec::new();
    collect_starts(&tree.root, &mut starts);
    let extras = starts.len().saturating_sub(1);
    match starts.into_iter().next() {
        Some(block) => Ok((block, extras)),
        None => Err(StructureError::NoStartBlock),
    }
}

fn collect_starts<'a>(el: &'a Element, out: &mut Vec<Block<'a>>) {
    if let Some(block) = Block::from_element(el) {
        // Start blocks are top level; no need to descend into slots.
        if block.block_type() == START_BLOCK_TYPE {
            out.push(block);
        }
        return;
    }
    for child in el.children() {
        collect_starts(child, out);
    }
}

pub mod error;
pub(crate) mod scan;

pub use error::ParseError;

use std::rc::Rc;

use crate::ProgramTree;
use crate::text::TextView;

/// Largest accepted source buffer. Program descriptions top out around
/// 8-16 KB on the target device; anything beyond this ceiling is
/// resource exhaustion, not a structural problem, and is rejected
/// before the scan starts.
pub const MAX_SOURCE_BYTES: usize = 64 * 1024;

/// Parser entry point.
pub struct Parser {
    source: Rc<str>,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source: source.into(),
            file_id,
        }
    }

    /// Parse the source into a ProgramTree: strip the prolog, then scan
    /// one top-level element. The element scan itself cannot fail;
    /// malformed structure degrades locally (see `scan`).
    pub fn parse(&self) -> Result<ProgramTree, ParseError> {
        if self.source.len() > MAX_SOURCE_BYTES {
            return Err(ParseError::error(
                format!(
                    "source buffer is {} bytes, over the {} byte ceiling",
                    self.source.len(),
                    MAX_SOURCE_BYTES
                ),
                0..0,
                self.file_id,
            )
            .with_note("the program description does not fit in device memory"));
        }

        let view = TextView::new(Rc::clone(&self.source));
        let body = skip_prolog(&view);
        match scan::parse_element(&view, body) {
            Some((root, _)) => Ok(ProgramTree {
                root,
                source_id: self.file_id,
            }),
            None => Err(ParseError::error(
                "no element found in source",
                0..self.source.len().min(1),
                self.file_id,
            )),
        }
    }
}

/// Skip a BOM, leading whitespace, `<?...?>` declarations and
/// `<!--...-->` comments. Returns the offset of the document body.
fn skip_prolog(view: &TextView) -> usize {
    let mut pos = 0;
    if view.starts_with("\u{feff}") {
        pos += '\u{feff}'.len_utf8();
    }
    loop {
        while view.byte_at(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        if view.byte_at(pos) != Some(b'<') {
            break;
        }
        match view.byte_at(pos + 1) {
            Some(b'?') => match view.find_str("?>", pos + 2) {
                Some(end) => pos = end + 2,
                None => break,
            },
            Some(b'!') => {
                let is_comment = view
                    .slice_from(pos)
                    .is_some_and(|rest| rest.starts_with("<!--"));
                if is_comment {
                    match view.find_str("-->", pos + 4) {
                        Some(end) => pos = end + 3,
                        None => break,
                    }
                } else {
                    match view.find_byte(b'>', pos + 2) {
                        Some(end) => pos = end + 1,
                        None => break,
                    }
                }
            }
            _ => break,
        }
    }
    pos
}

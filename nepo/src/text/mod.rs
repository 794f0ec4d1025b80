use std::fmt;
use std::rc::Rc;

/// An immutable zero-copy span over a shared program buffer.
/// Cloning bumps a reference count; subviews share the same buffer.
/// All scanning works on bytes; the block vocabulary is ASCII, and the
/// parser only splits at ASCII bytes, so UTF-8 boundaries are preserved
/// by construction.
#[derive(Clone)]
pub struct TextView {
    buf: Rc<str>,
    start: usize,
    end: usize,
}

impl TextView {
    /// A view covering the entire buffer.
    pub fn new(buf: Rc<str>) -> Self {
        let end = buf.len();
        TextView { buf, start: 0, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The viewed text. O(1); no copy.
    pub fn as_str(&self) -> &str {
        &self.buf[self.start..self.end]
    }

    /// The byte at index `i`, or None outside `[0, len)`.
    pub fn byte_at(&self, i: usize) -> Option<u8> {
        self.as_str().as_bytes().get(i).copied()
    }

    /// Subview `[start, end)`. O(1). None when the bounds are invalid
    /// or would split a UTF-8 sequence.
    pub fn slice(&self, start: usize, end: usize) -> Option<TextView> {
        if start > end || end > self.len() {
            return None;
        }
        self.buf.get(self.start + start..self.start + end)?;
        Some(TextView {
            buf: Rc::clone(&self.buf),
            start: self.start + start,
            end: self.start + end,
        })
    }

    /// Subview from `start` to the end of this view.
    pub fn slice_from(&self, start: usize) -> Option<TextView> {
        self.slice(start, self.len())
    }

    /// Index of the first occurrence of byte `b` at or after `from`.
    pub fn find_byte(&self, b: u8, from: usize) -> Option<usize> {
        let bytes = self.as_str().as_bytes();
        bytes
            .get(from..)?
            .iter()
            .position(|&c| c == b)
            .map(|p| from + p)
    }

    /// Index of the first occurrence of `needle` at or after `from`.
    /// Linear scan.
    pub fn find_str(&self, needle: &str, from: usize) -> Option<usize> {
        self.as_str().get(from..)?.find(needle).map(|p| from + p)
    }

    /// A narrowed view with leading and trailing ASCII whitespace
    /// removed. No copy.
    pub fn trim(&self) -> TextView {
        let bytes = self.as_str().as_bytes();
        let mut lo = 0;
        let mut hi = bytes.len();
        while lo < hi && bytes[lo].is_ascii_whitespace() {
            lo += 1;
        }
        while hi > lo && bytes[hi - 1].is_ascii_whitespace() {
            hi -= 1;
        }
        TextView {
            buf: Rc::clone(&self.buf),
            start: self.start + lo,
            end: self.start + hi,
        }
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix)
    }
}

/// Content equality: two views are equal when they show the same text,
/// regardless of which buffer or offset they come from.
impl PartialEq for TextView {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TextView {}

impl PartialEq<str> for TextView {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for TextView {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for TextView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TextView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextView({:?} @ {})", self.as_str(), self.start)
    }
}

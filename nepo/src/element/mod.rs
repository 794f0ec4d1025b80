use std::cell::OnceCell;

use crate::parser::scan;
use crate::text::TextView;

/// A single `name="value"` pair from an opening tag. Both sides are
/// views into the program buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: TextView,
    pub value: TextView,
}

/// A lazily-materialized XML element.
///
/// Construction stores three spans (the whole element, the opening-tag
/// interior, and the content between the tags) and nothing else. Tag
/// name, attributes, children and text are computed on first access and
/// memoized; materialization is pure, so repeated access returns
/// content-equal results. The interpreter never mutates an element.
#[derive(Debug, Clone)]
pub struct Element {
    whole: TextView,
    open_tag: TextView,
    inner: TextView,
    tag_name: OnceCell<TextView>,
    attributes: OnceCell<Vec<Attribute>>,
    children: OnceCell<Vec<Element>>,
    text: OnceCell<Option<TextView>>,
}

impl Element {
    pub(crate) fn from_spans(whole: TextView, open_tag: TextView, inner: TextView) -> Self {
        Element {
            whole,
            open_tag,
            inner,
            tag_name: OnceCell::new(),
            attributes: OnceCell::new(),
            children: OnceCell::new(),
            text: OnceCell::new(),
        }
    }

    /// Span of the whole element, opening tag through closing tag.
    pub fn whole(&self) -> &TextView {
        &self.whole
    }

    /// Span of the content between the opening and closing tags.
    /// Empty for self-closing elements.
    pub fn inner(&self) -> &TextView {
        &self.inner
    }

    /// The element's tag name.
    pub fn tag_name(&self) -> &str {
        self.tag_name
            .get_or_init(|| scan::tag_name(&self.open_tag))
            .as_str()
    }

    /// All attributes of the opening tag, in document order.
    pub fn attributes(&self) -> &[Attribute] {
        self.attributes
            .get_or_init(|| scan::scan_attributes(&self.open_tag))
    }

    /// The value of the attribute named `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&TextView> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// All child elements, in document order. Stray closing tags and
    /// `<?`/`<!` spans inside the content produce no children.
    pub fn children(&self) -> &[Element] {
        self.children
            .get_or_init(|| scan::scan_children(&self.inner))
    }

    /// The first child element with the given tag name.
    pub fn child_tagged(&self, tag: &str) -> Option<&Element> {
        self.children().iter().find(|c| c.tag_name() == tag)
    }

    /// Direct text content: the trimmed inner span when it contains no
    /// markup, None when the element has child elements instead.
    pub fn text(&self) -> Option<&str> {
        self.text
            .get_or_init(|| {
                if self.inner.find_byte(b'<', 0).is_some() {
                    None
                } else {
                    Some(self.inner.trim())
                }
            })
            .as_ref()
            .map(|v| v.as_str())
    }
}

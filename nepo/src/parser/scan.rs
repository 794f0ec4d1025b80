use crate::element::{Attribute, Element};
use crate::text::TextView;

// ---------------------------------------------------------------------------
// Element scan
// ---------------------------------------------------------------------------

/// Parse one element starting at the first `<` at or after `from`.
/// Returns the element and the offset just past it, relative to `region`.
///
/// Malformed input never fails the scan once an opening tag has been
/// found: an element with no matching closing tag degrades to
/// self-closing with empty content. None is returned only when there is
/// no `<` left, or the opening tag itself is truncated (no `>`).
pub(crate) fn parse_element(region: &TextView, from: usize) -> Option<(Element, usize)> {
    let lt = region.find_byte(b'<', from)?;
    let gt = region.find_byte(b'>', lt + 1)?;

    let self_closing = gt > lt + 1 && region.byte_at(gt - 1) == Some(b'/');
    let open_end = if self_closing { gt - 1 } else { gt };
    let open_tag = region.slice(lt + 1, open_end)?;

    if self_closing {
        let whole = region.slice(lt, gt + 1)?;
        let inner = region.slice(gt + 1, gt + 1)?;
        return Some((Element::from_spans(whole, open_tag, inner), gt + 1));
    }

    let name = tag_name(&open_tag);

    // Scan forward for the balanced `</name>`. Same-named descendants
    // bump the depth unless they are self-closing; `<?` and `<!` spans
    // are skipped without affecting it.
    let mut depth = 1usize;
    let mut pos = gt + 1;
    loop {
        let Some(lt2) = region.find_byte(b'<', pos) else {
            break;
        };
        match region.byte_at(lt2 + 1) {
            Some(b'/') => {
                let Some(close_gt) = region.find_byte(b'>', lt2 + 1) else {
                    break;
                };
                if closing_matches(region, lt2 + 2, close_gt, name.as_str()) {
                    depth -= 1;
                    if depth == 0 {
                        let whole = region.slice(lt, close_gt + 1)?;
                        let inner = region.slice(gt + 1, lt2)?;
                        return Some((Element::from_spans(whole, open_tag, inner), close_gt + 1));
                    }
                }
                pos = close_gt + 1;
            }
            Some(b'?') | Some(b'!') => {
                let Some(skip_gt) = region.find_byte(b'>', lt2 + 1) else {
                    break;
                };
                pos = skip_gt + 1;
            }
            Some(_) => {
                let Some(tag_gt) = region.find_byte(b'>', lt2 + 1) else {
                    break;
                };
                let nested_self_closing = region.byte_at(tag_gt - 1) == Some(b'/');
                if !nested_self_closing && opening_matches(region, lt2 + 1, name.as_str()) {
                    depth += 1;
                }
                pos = tag_gt + 1;
            }
            None => break,
        }
    }

    // No matching closing tag: degrade to self-closing, empty content.
    let whole = region.slice(lt, gt + 1)?;
    let inner = region.slice(gt + 1, gt + 1)?;
    Some((Element::from_spans(whole, open_tag, inner), gt + 1))
}

/// The tag name: opening-tag text up to the first whitespace.
pub(crate) fn tag_name(open_tag: &TextView) -> TextView {
    let bytes = open_tag.as_str().as_bytes();
    let end = bytes
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    open_tag.slice(0, end).unwrap_or_else(|| open_tag.clone())
}

/// Does the closing tag `</ .. >` spanning `start..gt` name this element?
fn closing_matches(region: &TextView, start: usize, gt: usize, name: &str) -> bool {
    region
        .slice(start, gt)
        .is_some_and(|text| text.trim() == name)
}

/// Does an opening tag starting at `start` (just past `<`) carry this
/// element's name? The name must be followed by whitespace, `>` or `/`
/// so that `<blocks>` does not count as a nested `<block>`.
fn opening_matches(region: &TextView, start: usize, name: &str) -> bool {
    let bytes = region.as_str().as_bytes();
    let needle = name.as_bytes();
    let Some(candidate) = bytes.get(start..start + needle.len()) else {
        return false;
    };
    if candidate != needle {
        return false;
    }
    match bytes.get(start + needle.len()) {
        Some(b'>') | Some(b'/') => true,
        Some(b) => b.is_ascii_whitespace(),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Attribute scan
// ---------------------------------------------------------------------------

/// Scan the opening tag after the tag name for whitespace-separated
/// `name="value"` pairs. No escaped-quote support; a malformed tail
/// ends the scan silently.
pub(crate) fn scan_attributes(open_tag: &TextView) -> Vec<Attribute> {
    let bytes = open_tag.as_str().as_bytes();
    let mut attrs = Vec::new();
    let mut pos = tag_name(open_tag).len();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let name_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let name_end = pos;

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            break;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'"') {
            break;
        }
        pos += 1;

        let value_start = pos;
        let Some(value_end) = open_tag.find_byte(b'"', pos) else {
            break;
        };
        let (Some(name), Some(value)) = (
            open_tag.slice(name_start, name_end),
            open_tag.slice(value_start, value_end),
        ) else {
            break;
        };
        attrs.push(Attribute { name, value });
        pos = value_end + 1;
    }

    attrs
}

// ---------------------------------------------------------------------------
// Child scan
// ---------------------------------------------------------------------------

/// Scan an inner span left to right for child elements. Closing tags
/// and `<?`/`<!` spans are skipped without producing a node; every
/// child shares the parent's buffer.
pub(crate) fn scan_children(inner: &TextView) -> Vec<Element> {
    let mut children = Vec::new();
    let mut pos = 0;

    while let Some(lt) = inner.find_byte(b'<', pos) {
        match inner.byte_at(lt + 1) {
            Some(b'/') | Some(b'?') | Some(b'!') => match inner.find_byte(b'>', lt + 1) {
                Some(gt) => pos = gt + 1,
                None => break,
            },
            Some(_) => match parse_element(inner, lt) {
                Some((element, end)) => {
                    children.push(element);
                    pos = end;
                }
                None => break,
            },
            None => break,
        }
    }

    children
}

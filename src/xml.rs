//! Small streaming XML helpers over `quick-xml`.
//!
//! Finding aids and the metadata service mix namespaced (`ead:c`) and plain
//! (`c`, `c01`..`c12`) forms, so everything here matches on local names.

use quick_xml::events::Event;
use quick_xml::Reader;

/// EAD 2002 namespace.
pub const EAD_NS: &str = "urn:isbn:1-931666-22-9";
/// XLink namespace used by `<dao>` attributes.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Whether `local` is an EAD component element: `c` or `c01`..`c12`.
pub fn is_component_element(local: &[u8]) -> bool {
    match local {
        b"c" => true,
        [b'c', d1, d2] if d1.is_ascii_digit() && d2.is_ascii_digit() => {
            let n = (d1 - b'0') * 10 + (d2 - b'0');
            (1..=12).contains(&n)
        }
        _ => false,
    }
}

/// A path step; `"c"` matches any component element.
fn step_matches(step: &str, local: &[u8]) -> bool {
    if step == "c" {
        is_component_element(local)
    } else {
        step.as_bytes() == local
    }
}

/// Descendant-axis match: the open-element stack ends with `path`.
fn stack_ends_with(stack: &[Vec<u8>], path: &[&str]) -> bool {
    stack.len() >= path.len()
        && stack[stack.len() - path.len()..]
            .iter()
            .zip(path)
            .all(|(local, step)| step_matches(step, local))
}

fn position_error(reader: &Reader<&[u8]>, e: impl std::fmt::Display) -> String {
    format!("at byte {}: {e}", reader.buffer_position())
}

/// Text content (including descendants) of the first element matching
/// `//path[0]/path[1]/...`.
pub fn first_text(xml: &str, path: &[&str]) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut capture_depth: Option<usize> = None;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| position_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                stack.push(e.local_name().as_ref().to_vec());
                if capture_depth.is_none() && stack_ends_with(&stack, path) {
                    capture_depth = Some(stack.len());
                }
            }
            Event::Empty(e) => {
                if capture_depth.is_none() {
                    stack.push(e.local_name().as_ref().to_vec());
                    if stack_ends_with(&stack, path) {
                        return Ok(Some(String::new()));
                    }
                    stack.pop();
                }
            }
            Event::Text(e) if capture_depth.is_some() => {
                let unescaped = e.unescape().map_err(|e| position_error(&reader, e))?;
                text.push_str(&unescaped);
            }
            Event::CData(e) if capture_depth.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(_) => {
                if capture_depth == Some(stack.len()) {
                    return Ok(Some(text));
                }
                stack.pop();
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Value of attribute `attr` (by local name) on the first element matching
/// `//path[0]/path[1]/...` that carries it.
pub fn first_attribute(xml: &str, path: &[&str], attr: &str) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| position_error(&reader, e))?;
        let (element, empty) = match event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Eof => return Ok(None),
            _ => continue,
        };

        stack.push(element.local_name().as_ref().to_vec());
        if stack_ends_with(&stack, path) {
            for attribute in element.attributes() {
                let attribute = attribute.map_err(|e| position_error(&reader, e))?;
                if attribute.key.local_name().as_ref() == attr.as_bytes() {
                    let value = attribute
                        .unescape_value()
                        .map_err(|e| position_error(&reader, e))?;
                    return Ok(Some(value.into_owned()));
                }
            }
        }
        if empty {
            stack.pop();
        }
    }
}

/// Check that `xml` is well-formed by reading it to the end.
pub fn check_well_formed(xml: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(xml);
    let mut saw_root = false;
    loop {
        match reader
            .read_event()
            .map_err(|e| position_error(&reader, e))?
        {
            Event::Start(_) | Event::Empty(_) => saw_root = true,
            Event::Eof if saw_root => return Ok(()),
            Event::Eof => return Err("document has no root element".to_string()),
            _ => {}
        }
    }
}

/// Trim and collapse runs of whitespace to a single space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

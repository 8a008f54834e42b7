//! Idempotent `<dao>` upsert over a streaming copy of the document.
//!
//! The document is re-emitted event by event, so everything outside the
//! inserted element (declaration, doctype, comments, attribute order,
//! whitespace) is preserved byte for byte.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::xml::{is_component_element, XLINK_NS};

/// `xlink:role` of a DAO pointing at a METS record.
pub const METS_ROLE: &str = "http://www.loc.gov/METS/";

/// Result of an upsert on an in-memory document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The document with the new `<dao>` appended to the component's `<did>`.
    Inserted(String),
    /// A `<dao>` with the same href is already a child of the `<did>`.
    AlreadyPresent,
}

/// Why an upsert could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertError {
    /// The document is not well-formed XML.
    Malformed(String),
    /// No component element carries the requested id.
    ComponentNotFound,
    /// The component exists but has no `<did>`.
    MissingDid,
}

#[derive(Debug, Default)]
struct Frame {
    target_component: bool,
    target_did: bool,
    /// Prefix bound to the XLink namespace on this element, if any.
    xlink_prefix: Option<String>,
}

fn xml_err(reader: &Reader<&[u8]>, e: impl std::fmt::Display) -> UpsertError {
    UpsertError::Malformed(format!("at byte {}: {e}", reader.buffer_position()))
}

fn write_err(e: impl std::fmt::Display) -> UpsertError {
    UpsertError::Malformed(format!("failed to re-serialize: {e}"))
}

/// Value of the attribute whose local name is `local`.
fn attribute_value(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    local: &[u8],
) -> Result<Option<String>, UpsertError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_err(reader, e))?;
        if attribute.key.local_name().as_ref() == local {
            let value = attribute.unescape_value().map_err(|e| xml_err(reader, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Prefix this element binds to the XLink namespace (`xmlns:p="...xlink"`).
fn declared_xlink_prefix(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
) -> Result<Option<String>, UpsertError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_err(reader, e))?;
        if let Some(prefix) = attribute.key.as_ref().strip_prefix(b"xmlns:") {
            if attribute.value.as_ref() == XLINK_NS.as_bytes() {
                return Ok(Some(String::from_utf8_lossy(prefix).into_owned()));
            }
        }
    }
    Ok(None)
}

/// XLink prefix visible to a child of `stack`, preferring `own`.
fn xlink_in_scope(stack: &[Frame], own: &Option<String>) -> Option<String> {
    own.clone()
        .or_else(|| stack.iter().rev().find_map(|f| f.xlink_prefix.clone()))
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

/// Build the `<dao>` element in the `<did>`'s namespace prefix.
fn dao_element(did_prefix: Option<&str>, xlink_prefix: Option<&str>, href: &str) -> BytesStart<'static> {
    let mut dao = BytesStart::new(qualified(did_prefix, "dao"));
    let xlink = xlink_prefix.unwrap_or("xlink");
    if xlink_prefix.is_none() {
        dao.push_attribute(("xmlns:xlink", XLINK_NS));
    }
    dao.push_attribute((format!("{xlink}:type").as_str(), "simple"));
    dao.push_attribute((format!("{xlink}:role").as_str(), METS_ROLE));
    dao.push_attribute((format!("{xlink}:href").as_str(), href));
    dao
}

/// Ensure the component with `component_id` links to `href`.
///
/// Components are `<c>` or `<c01>`..`<c12>` in any prefix; the first one
/// whose `id` equals `component_id` is used, and its first `<did>` child
/// receives the `<dao>`. An existing `<dao>` child of that `<did>` with the
/// same href (in any attribute namespace) makes this a no-op.
pub fn upsert_dao(xml: &str, component_id: &str, href: &str) -> Result<Upsert, UpsertError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut stack: Vec<Frame> = Vec::new();

    let mut component_seen = false;
    let mut did_done = false;
    let mut present = false;
    let mut inserted = false;
    let mut did_prefix: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| xml_err(&reader, e))?;
        match event {
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                let parent_is_target = stack.last().map(|f| f.target_component).unwrap_or(false);
                let in_target_did = stack.last().map(|f| f.target_did).unwrap_or(false);

                let mut frame = Frame {
                    xlink_prefix: declared_xlink_prefix(&reader, &e)?,
                    ..Frame::default()
                };

                if !component_seen
                    && is_component_element(&local)
                    && attribute_value(&reader, &e, b"id")?.as_deref() == Some(component_id)
                {
                    component_seen = true;
                    frame.target_component = true;
                } else if parent_is_target && !did_done && local == b"did" {
                    frame.target_did = true;
                    did_prefix = e
                        .name()
                        .prefix()
                        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
                } else if in_target_did
                    && local == b"dao"
                    && attribute_value(&reader, &e, b"href")?.as_deref() == Some(href)
                {
                    present = true;
                }

                stack.push(frame);
                writer.write_event(Event::Start(e)).map_err(write_err)?;
            }
            Event::Empty(e) => {
                let local = e.local_name().as_ref().to_vec();
                let parent_is_target = stack.last().map(|f| f.target_component).unwrap_or(false);
                let in_target_did = stack.last().map(|f| f.target_did).unwrap_or(false);

                if !component_seen
                    && is_component_element(&local)
                    && attribute_value(&reader, &e, b"id")?.as_deref() == Some(component_id)
                {
                    // An empty component has no <did>.
                    component_seen = true;
                } else if parent_is_target && !did_done && local == b"did" {
                    did_done = true;
                    let prefix = e
                        .name()
                        .prefix()
                        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
                    let own = declared_xlink_prefix(&reader, &e)?;
                    let xlink = xlink_in_scope(&stack, &own);
                    let end = e.to_end().into_owned();
                    writer.write_event(Event::Start(e)).map_err(write_err)?;
                    writer
                        .write_event(Event::Empty(dao_element(
                            prefix.as_deref(),
                            xlink.as_deref(),
                            href,
                        )))
                        .map_err(write_err)?;
                    writer.write_event(Event::End(end)).map_err(write_err)?;
                    inserted = true;
                    continue;
                } else if in_target_did
                    && local == b"dao"
                    && attribute_value(&reader, &e, b"href")?.as_deref() == Some(href)
                {
                    present = true;
                }

                writer.write_event(Event::Empty(e)).map_err(write_err)?;
            }
            Event::End(e) => {
                let frame = stack.pop().unwrap_or_default();
                if frame.target_did {
                    did_done = true;
                    if !present {
                        let xlink = xlink_in_scope(&stack, &frame.xlink_prefix);
                        writer
                            .write_event(Event::Empty(dao_element(
                                did_prefix.as_deref(),
                                xlink.as_deref(),
                                href,
                            )))
                            .map_err(write_err)?;
                        inserted = true;
                    }
                }
                writer.write_event(Event::End(e)).map_err(write_err)?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(write_err)?,
        }
    }

    if !component_seen {
        return Err(UpsertError::ComponentNotFound);
    }
    if !did_done {
        return Err(UpsertError::MissingDid);
    }
    if present || !inserted {
        return Ok(Upsert::AlreadyPresent);
    }

    String::from_utf8(writer.into_inner())
        .map(Upsert::Inserted)
        .map_err(write_err)
}

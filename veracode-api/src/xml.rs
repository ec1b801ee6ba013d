//! Small helpers shared by the XML response parsers.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use std::collections::HashMap;

/// Collect the attributes of an element into a map keyed by local name.
///
/// Values are XML-unescaped; a value with a malformed entity is kept verbatim.
pub(crate) fn attributes(e: &BytesStart<'_>) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect()
}

/// If the document's root element is `<error>`, return its text.
///
/// The XML APIs answer with `<error>message</error>` instead of the expected
/// document when a request cannot be served (unknown id, results not ready).
/// Entity and character references in the message are resolved.
pub(crate) fn error_message(xml: &str) -> Result<Option<String>, quick_xml::Error> {
    // Text is not trimmed per event: references split it into several events.
    let mut reader = Reader::from_str(xml);

    let mut buf = Vec::new();
    let mut in_error = false;
    let mut message = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                if e.local_name().as_ref() == b"error" {
                    in_error = true;
                } else {
                    return Ok(None);
                }
            }
            Event::Empty(ref e) => {
                return Ok((e.local_name().as_ref() == b"error").then(String::new));
            }
            Event::Text(ref e) if in_error => message.push_str(&e.xml_content()?),
            Event::CData(ref e) if in_error => message.push_str(&e.decode()?),
            Event::GeneralRef(ref e) if in_error => push_reference(&mut message, e)?,
            Event::End(_) if in_error => return Ok(Some(message.trim().to_string())),
            Event::Eof => return Ok(in_error.then(|| message.trim().to_string())),
            _ => {}
        }
        buf.clear();
    }
}

/// Append the text a `&name;` or `&#N;` reference stands for. Unknown
/// entities are kept as written.
fn push_reference(out: &mut String, reference: &BytesRef<'_>) -> Result<(), quick_xml::Error> {
    if let Some(ch) = reference.resolve_char_ref()? {
        out.push(ch);
        return Ok(());
    }
    let name = reference.decode()?;
    match resolve_predefined_entity(&name) {
        Some(text) => out.push_str(text),
        None => {
            out.push('&');
            out.push_str(&name);
            out.push(';');
        }
    }
    Ok(())
}

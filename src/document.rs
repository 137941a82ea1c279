//! Normalization of gateway documents before they are decoded.
//!
//! The gateway encodes "no value" as an element carrying `nil="true"` instead of omitting it. Decoding
//! such an element into an optional field yields an empty value rather than `None`, so those elements are
//! removed first.

use quick_xml::{
    events::{BytesStart, Event},
    name::QName,
    Reader, Writer,
};

use crate::error::DocumentError;

const NIL_ATTRIBUTE: &[u8] = b"nil";
const NIL_VALUE: &[u8] = b"true";

/// Removes every element marked `nil="true"`, along with its subtree, and copies everything else verbatim.
pub fn strip_nil_elements(data: &[u8]) -> Result<Vec<u8>, DocumentError> {
    let mut reader = Reader::from_reader(data);
    let mut writer = Writer::new(Vec::with_capacity(data.len()));
    let mut buf = Vec::new();
    let mut skipped = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(start) => {
                if is_nil(&start)? {
                    let name = start.name().as_ref().to_vec();
                    reader.read_to_end_into(QName(&name), &mut skipped)?;
                    skipped.clear();
                } else {
                    depth += 1;
                    writer.write_event(Event::Start(start))?;
                }
            }
            Event::Empty(start) => {
                if !is_nil(&start)? {
                    writer.write_event(Event::Empty(start))?;
                }
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(end))?;
            }
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    if depth > 0 {
        return Err(DocumentError::Unterminated(depth));
    }
    Ok(writer.into_inner())
}

/// Whether a start tag carries the unprefixed `nil="true"` marker.
pub fn is_nil(start: &BytesStart<'_>) -> Result<bool, DocumentError> {
    for attribute in start.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == NIL_ATTRIBUTE && attribute.value.as_ref() == NIL_VALUE {
            return Ok(true);
        }
    }
    Ok(false)
}

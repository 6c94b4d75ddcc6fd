//! Markup reader and writer helpers for [`MemoryDom`](super::MemoryDom).

use super::memory::{MemoryDom, MemoryNode};
use super::Dom;
use crate::error::MarkupError;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub(super) fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Parse `source` and append the result to `parent`.
pub(super) fn parse_into(
    dom: &MemoryDom,
    parent: &MemoryNode,
    source: &str,
) -> Result<(), MarkupError> {
    // (insertion parent, tag that closes it)
    let mut stack: Vec<(MemoryNode, String)> = vec![(parent.clone(), String::new())];
    let bytes = source.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"<!--") {
            match find(bytes, i + 4, b"-->") {
                Some(end) => i = end + 3,
                None => return Err(MarkupError::UnclosedComment(i)),
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let (tag, next) = parse_end_tag(source, i)?;
            i = next;
            match stack.iter().rposition(|(_, open)| *open == tag) {
                Some(position) if position > 0 => stack.truncate(position),
                _ => return Err(MarkupError::UnexpectedClose(tag)),
            }
            continue;
        }

        let insertion = stack
            .last()
            .map_or_else(|| parent.clone(), |(node, _)| node.clone());

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (tag, attributes, self_closing, next) = parse_start_tag(source, i)?;
            i = next;

            let element = dom.create_element(&tag);
            for (name, value) in &attributes {
                dom.set_attribute(&element, name, value);
            }
            dom.append_child(&insertion, &element);

            if self_closing || is_void_tag(&tag) {
                continue;
            }
            // Template children go into the inert content, not the tree.
            let sink = dom.template_fragment(&element).unwrap_or(element);
            stack.push((sink, tag));
            continue;
        }

        let start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        let text = &source[start..i];
        if !text.trim().is_empty() {
            dom.append_child(&insertion, &dom.create_text(&decode_entities(text)));
        }
    }

    Ok(())
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn skip_whitespace(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b':'
}

fn is_attribute_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':' | b'.' | b'@')
}

type StartTag = (String, Vec<(String, String)>, bool, usize);

fn parse_start_tag(source: &str, at: usize) -> Result<StartTag, MarkupError> {
    let bytes = source.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = source[tag_start..i].to_ascii_lowercase();
    if tag.is_empty() {
        return Err(MarkupError::EmptyTagName(at));
    }

    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_whitespace(bytes, &mut i);
        if i >= bytes.len() {
            return Err(MarkupError::UnclosedStartTag(tag));
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
            i += 2;
            self_closing = true;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attribute_name_char(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            // Stray byte inside the tag; skip it.
            i += 1;
            continue;
        }
        let name = source[name_start..i].to_ascii_lowercase();

        skip_whitespace(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_whitespace(bytes, &mut i);
            parse_attribute_value(source, &name, &mut i)?
        } else {
            String::new()
        };

        // First occurrence wins.
        if !attributes.iter().any(|(existing, _)| *existing == name) {
            attributes.push((name, value));
        }
    }

    Ok((tag, attributes, self_closing, i))
}

fn parse_attribute_value(source: &str, name: &str, i: &mut usize) -> Result<String, MarkupError> {
    let bytes = source.as_bytes();
    match bytes.get(*i) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            *i += 1;
            let start = *i;
            while *i < bytes.len() && bytes[*i] != quote {
                *i += 1;
            }
            if *i >= bytes.len() {
                return Err(MarkupError::UnclosedAttribute(name.to_string()));
            }
            let value = decode_entities(&source[start..*i]);
            *i += 1;
            Ok(value)
        }
        Some(_) => {
            let start = *i;
            while *i < bytes.len()
                && !bytes[*i].is_ascii_whitespace()
                && bytes[*i] != b'>'
                && !(bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>'))
            {
                *i += 1;
            }
            Ok(decode_entities(&source[start..*i]))
        }
        None => Err(MarkupError::UnclosedStartTag(name.to_string())),
    }
}

fn parse_end_tag(source: &str, at: usize) -> Result<(String, usize), MarkupError> {
    let bytes = source.as_bytes();
    let mut i = at + 2;
    skip_whitespace(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = source[tag_start..i].to_ascii_lowercase();
    if tag.is_empty() {
        return Err(MarkupError::EmptyTagName(at));
    }

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(MarkupError::UnclosedEndTag(at));
    }
    Ok((tag, i + 1))
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

pub(super) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(super) fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

//! Canonical fixed-form writer for entity files.
//!
//! The on-disk form is not standard XML serialization: every element opens
//! on its own line at `2 * depth` spaces, every attribute sits on its own
//! line indented four further spaces, archimate-namespace roots are written
//! with the `archimate:` prefix and two fixed `xmlns` attribute lines, and
//! attribute names in the XML-Schema-instance namespace are re-prefixed to
//! `xsi:`. No XML declaration is emitted.

use super::{Element, ARCHIMATE_NS, XSI_NS};

/// Writes `element` and its subtree into `out` at the given indentation.
pub fn write_element(element: &Element, out: &mut String, indentation: usize) {
    let pad = " ".repeat(indentation);
    let archimate_prefix = format!("{{{ARCHIMATE_NS}}}");
    let tag = match element.tag.strip_prefix(archimate_prefix.as_str()) {
        Some(local) => {
            let tag = format!("archimate:{local}");
            out.push_str(&format!("{pad}<{tag}\n"));
            out.push_str(&format!("{pad}    xmlns:xsi=\"{XSI_NS}\"\n"));
            out.push_str(&format!("{pad}    xmlns:archimate=\"{ARCHIMATE_NS}\""));
            tag
        }
        None => {
            let tag = element.tag.clone();
            out.push_str(&format!("{pad}<{tag}"));
            tag
        }
    };

    let xsi_expanded = format!("{{{XSI_NS}}}");
    for (name, value) in &element.attrs {
        let name = name.replace(xsi_expanded.as_str(), "xsi:");
        out.push_str(&format!("\n{pad}    {name}={}", quote_attr(value)));
    }

    if element.children.is_empty() {
        out.push_str("/>\n");
    } else {
        out.push_str(">\n");
        for child in &element.children {
            write_element(child, out, indentation + 2);
        }
        out.push_str(&format!("{pad}</{tag}>\n"));
    }
}

/// Escapes an attribute value and wraps it in double quotes. `"` becomes
/// `&quot;` so double quoting is always safe; control whitespace becomes
/// numeric character references so values round-trip through a reparse.
fn quote_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

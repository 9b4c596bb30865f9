//! Pretty-printing for composer drafts

use crate::types::{Draft, FrameKind};
use crate::{ConsoleError, Result};

const INDENT: &str = "  ";

impl Draft {
    /// Re-indent the payload according to its kind
    ///
    /// JSON is parsed and re-serialized, so a syntax error is returned as
    /// [`ConsoleError::Parse`] and the draft is left untouched. XML is
    /// re-indented one level per open element without validation. Other
    /// kinds come back unchanged.
    pub fn formatted(&self) -> Result<Draft> {
        let payload = match self.kind {
            FrameKind::Json => pretty_json(&self.payload)?,
            FrameKind::Xml => pretty_xml(&self.payload),
            _ => self.payload.clone(),
        };
        Ok(Draft { kind: self.kind, payload })
    }
}

/// Pretty-print JSON with two-space indentation
pub fn pretty_json(raw: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ConsoleError::parse_error("JSON draft", e.to_string()))?;
    serde_json::to_string_pretty(&value)
        .map_err(|e| ConsoleError::parse_error("JSON draft", e.to_string()))
}

/// Re-indent XML, one element per line
///
/// Elements whose text and closing tag sit on the same line (`<a>x</a>`) stay
/// on one line.
pub fn pretty_xml(raw: &str) -> String {
    let mut depth = 0usize;
    let mut lines = Vec::new();

    for node in split_nodes(raw.trim()) {
        if node.starts_with("</") {
            depth = depth.saturating_sub(1);
            lines.push(format!("{}{}", INDENT.repeat(depth), node));
        } else if opens_element(node) {
            lines.push(format!("{}{}", INDENT.repeat(depth), node));
            depth += 1;
        } else {
            lines.push(format!("{}{}", INDENT.repeat(depth), node));
        }
    }

    lines.join("\n")
}

fn opens_element(node: &str) -> bool {
    node.starts_with('<')
        && !node.starts_with("<?")
        && !node.starts_with("<!")
        && node.ends_with('>')
        && !node.ends_with("/>")
        && !node[1..].contains("</")
}

/// Break the document between adjacent tags (`>` followed by `<`)
fn split_nodes(xml: &str) -> Vec<&str> {
    let bytes = xml.as_bytes();
    let mut nodes = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'>' {
            let mut next = i + 1;
            while next < bytes.len() && bytes[next].is_ascii_whitespace() {
                next += 1;
            }
            if next < bytes.len() && bytes[next] == b'<' {
                nodes.push(xml[start..=i].trim());
                start = next;
                i = next;
                continue;
            }
        }
        i += 1;
    }

    let tail = xml[start..].trim();
    if !tail.is_empty() {
        nodes.push(tail);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_drafts_are_pretty_printed() {
        let draft = Draft::json(r#"{"action":"LOGIN","uid":1001}"#);
        let formatted = draft.formatted().unwrap();
        assert_eq!(formatted.payload, "{\n  \"action\": \"LOGIN\",\n  \"uid\": 1001\n}");
        assert_eq!(formatted.kind, FrameKind::Json);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = Draft::json("{broken").formatted().unwrap_err();
        assert!(matches!(err, ConsoleError::Parse { .. }));
    }

    #[test]
    fn xml_is_indented_per_element() {
        let raw = "<?xml version=\"1.0\"?><order><id>7</id><items><item/></items></order>";
        let expected = "<?xml version=\"1.0\"?>\n<order>\n  <id>7</id>\n  <items>\n    <item/>\n  </items>\n</order>";
        assert_eq!(pretty_xml(raw), expected);
    }

    #[test]
    fn xml_formatting_is_stable() {
        let once = pretty_xml("<a><b>x</b></a>");
        assert_eq!(pretty_xml(&once), once);
    }

    #[test]
    fn text_drafts_are_untouched() {
        let draft = Draft::text("  PING  ");
        assert_eq!(draft.formatted().unwrap(), draft);
    }
}

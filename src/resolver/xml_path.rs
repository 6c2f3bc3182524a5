//! XPath evaluation against an XML body.
//!
//! The body is parsed into a small in-memory node tree with quick_xml, then
//! the location path is walked against it. Supported grammar: absolute
//! paths (`/a/b`), a leading descendant search (`//name`), `*` element
//! wildcards, 1-based positional predicates (`[2]`), and a final `@attr` or
//! `text()` step. The first matching node wins; element matches render as
//! their serialized child-node list, the root path renders the document
//! element itself.

use crate::models::{ResolveResult, ResolveWarning};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

pub fn resolve(body: &str, path: &str) -> ResolveResult {
    let root = match parse_document(body) {
        Ok(root) => root,
        Err(()) => return ResolveResult::warning(ResolveWarning::InvalidXPath),
    };

    let steps = match parse_location_path(path) {
        Ok(steps) => steps,
        Err(()) => return ResolveResult::warning(ResolveWarning::InvalidXPath),
    };

    // A bare "/" addresses the document; render the root element whole.
    if steps.is_empty() {
        return ResolveResult::Success(serialize_element(&root));
    }

    match evaluate(&root, &steps) {
        Some(NodeMatch::Element(element)) => {
            ResolveResult::Success(serialize_children(element))
        }
        Some(NodeMatch::Value(text)) => ResolveResult::Success(text),
        None => ResolveResult::warning(ResolveWarning::IncorrectXPath),
    }
}

#[derive(Debug, PartialEq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, PartialEq)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }
}

fn parse_document(body: &str) -> Result<XmlElement, ()> {
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(element_from_start(&start)?);
            }
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or(())?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|_| ())?.into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return Err(()),
        }
    }

    if !stack.is_empty() {
        return Err(());
    }
    root.ok_or(())
}

fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement, ()> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|_| ())?;
        attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            attribute.unescape_value().map_err(|_| ())?.into_owned(),
        ));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        // Multiple document elements.
        Err(())
    }
}

#[derive(Debug, PartialEq)]
enum Step {
    /// Element name or `*`, with an optional 1-based position.
    Child { name: String, position: Option<usize> },
    /// Same, but searched at any depth (leading `//`).
    Descendant { name: String, position: Option<usize> },
    Attribute(String),
    Text,
}

enum NodeMatch<'a> {
    Element(&'a XmlElement),
    Value(String),
}

fn parse_location_path(path: &str) -> Result<Vec<Step>, ()> {
    let path = path.trim();
    if path.is_empty() {
        return Err(());
    }
    if path == "/" {
        return Ok(Vec::new());
    }

    let (mut rest, mut descendant) = match path.strip_prefix("//") {
        Some(rest) => (rest, true),
        None => (path.strip_prefix('/').unwrap_or(path), false),
    };

    let mut steps = Vec::new();
    loop {
        let end = rest.find('/').unwrap_or(rest.len());
        let (raw, remainder) = rest.split_at(end);
        steps.push(parse_step(raw, descendant)?);
        descendant = false;

        if remainder.is_empty() {
            break;
        }
        rest = &remainder[1..];
        if rest.is_empty() {
            return Err(());
        }
    }

    // @attr and text() only make sense as the final step.
    for step in &steps[..steps.len() - 1] {
        if matches!(step, Step::Attribute(_) | Step::Text) {
            return Err(());
        }
    }
    Ok(steps)
}

fn parse_step(raw: &str, descendant: bool) -> Result<Step, ()> {
    if raw.is_empty() {
        return Err(());
    }
    if let Some(attribute) = raw.strip_prefix('@') {
        if attribute.is_empty() {
            return Err(());
        }
        return Ok(Step::Attribute(attribute.to_string()));
    }
    if raw == "text()" {
        return Ok(Step::Text);
    }

    let (name, position) = match raw.split_once('[') {
        Some((name, predicate)) => {
            let predicate = predicate.strip_suffix(']').ok_or(())?;
            let position: usize = predicate.trim().parse().map_err(|_| ())?;
            if position == 0 {
                return Err(());
            }
            (name, Some(position))
        }
        None => (raw, None),
    };
    if name.is_empty() || name.contains(|c: char| c.is_whitespace()) {
        return Err(());
    }
    Ok(if descendant {
        Step::Descendant {
            name: name.to_string(),
            position,
        }
    } else {
        Step::Child {
            name: name.to_string(),
            position,
        }
    })
}

fn evaluate<'a>(root: &'a XmlElement, steps: &[Step]) -> Option<NodeMatch<'a>> {
    let mut current: Vec<&XmlElement> = match &steps[0] {
        Step::Child { name, position } => {
            // The first step of an absolute path names the document element.
            let matches: Vec<&XmlElement> = if name_matches(&root.name, name) {
                vec![root]
            } else {
                Vec::new()
            };
            pick(matches, *position)
        }
        Step::Descendant { name, position } => {
            let mut matches = Vec::new();
            collect_descendants(root, name, &mut matches);
            pick(matches, *position)
        }
        Step::Attribute(name) => {
            return root.attribute(name).map(|v| NodeMatch::Value(v.to_string()));
        }
        Step::Text => return Some(NodeMatch::Value(root.text())),
    };

    for step in &steps[1..] {
        match step {
            Step::Child { name, position } => {
                let matches: Vec<&XmlElement> = current
                    .iter()
                    .flat_map(|element| element.child_elements())
                    .filter(|child| name_matches(&child.name, name))
                    .collect();
                current = pick(matches, *position);
            }
            Step::Descendant { name, position } => {
                let mut matches = Vec::new();
                for element in &current {
                    collect_descendants(element, name, &mut matches);
                }
                current = pick(matches, *position);
            }
            Step::Attribute(name) => {
                return current
                    .first()
                    .and_then(|element| element.attribute(name))
                    .map(|v| NodeMatch::Value(v.to_string()));
            }
            Step::Text => {
                return current.first().map(|element| NodeMatch::Value(element.text()));
            }
        }
        if current.is_empty() {
            return None;
        }
    }

    current.first().copied().map(NodeMatch::Element)
}

fn pick(matches: Vec<&XmlElement>, position: Option<usize>) -> Vec<&XmlElement> {
    match position {
        Some(position) => matches.into_iter().nth(position - 1).into_iter().collect(),
        None => matches,
    }
}

fn name_matches(actual: &str, pattern: &str) -> bool {
    pattern == "*" || actual == pattern
}

fn collect_descendants<'a>(
    element: &'a XmlElement,
    name: &str,
    out: &mut Vec<&'a XmlElement>,
) {
    for child in element.child_elements() {
        if name_matches(&child.name, name) {
            out.push(child);
        }
        collect_descendants(child, name, out);
    }
}

fn serialize_element(element: &XmlElement) -> String {
    let mut out = String::new();
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return out;
    }
    out.push('>');
    out.push_str(&serialize_children(element));
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
    out
}

fn serialize_children(element: &XmlElement) -> String {
    element
        .children
        .iter()
        .map(|child| match child {
            XmlNode::Element(element) => serialize_element(element),
            XmlNode::Text(text) => escape_text(text),
        })
        .collect()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKS: &str = r#"<catalog>
  <book id="bk101"><title>XML Basics</title><price>39.95</price></book>
  <book id="bk102"><title>Advanced XML</title><price>49.95</price></book>
</catalog>"#;

    #[test]
    fn absolute_path_returns_child_node_list() {
        let result = resolve(BOOKS, "/catalog/book[1]/title");
        assert_eq!(result, ResolveResult::Success("XML Basics".to_string()));
    }

    #[test]
    fn descendant_search_finds_nested_elements() {
        assert_eq!(
            resolve(BOOKS, "//title"),
            ResolveResult::Success("XML Basics".to_string())
        );
        assert_eq!(
            resolve(BOOKS, "//book[2]/price"),
            ResolveResult::Success("49.95".to_string())
        );
    }

    #[test]
    fn attribute_step_returns_attribute_value() {
        assert_eq!(
            resolve(BOOKS, "/catalog/book[2]/@id"),
            ResolveResult::Success("bk102".to_string())
        );
    }

    #[test]
    fn text_step_returns_text_content() {
        assert_eq!(
            resolve(BOOKS, "//price/text()"),
            ResolveResult::Success("39.95".to_string())
        );
    }

    #[test]
    fn root_path_serializes_document_element() {
        let result = resolve("<a><b>1</b></a>", "/");
        assert_eq!(result, ResolveResult::Success("<a><b>1</b></a>".to_string()));
    }

    #[test]
    fn element_match_serializes_children_including_markup() {
        assert_eq!(
            resolve("<a><b><c>x</c>tail</b></a>", "/a/b"),
            ResolveResult::Success("<c>x</c>tail".to_string())
        );
    }

    #[test]
    fn no_match_warns_incorrect_path() {
        assert_eq!(
            resolve(BOOKS, "/catalog/magazine"),
            ResolveResult::warning(ResolveWarning::IncorrectXPath)
        );
        assert_eq!(
            resolve(BOOKS, "//book[5]"),
            ResolveResult::warning(ResolveWarning::IncorrectXPath)
        );
    }

    #[test]
    fn malformed_path_or_body_warns_invalid_path() {
        assert_eq!(
            resolve(BOOKS, ""),
            ResolveResult::warning(ResolveWarning::InvalidXPath)
        );
        assert_eq!(
            resolve(BOOKS, "/catalog/book[zero]"),
            ResolveResult::warning(ResolveWarning::InvalidXPath)
        );
        assert_eq!(
            resolve("<a><b></a>", "/a"),
            ResolveResult::warning(ResolveWarning::InvalidXPath)
        );
    }
}

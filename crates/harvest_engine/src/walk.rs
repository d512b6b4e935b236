//! Content container selection and document-order traversal.
//!
//! The walker visits the container's subtree with an explicit stack, in
//! document order. An accepted element becomes exactly one content node and
//! its subtree is consumed; a rejected element is dropped with its whole
//! subtree; anything else is a container to descend into.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::sanitize::{extract_text, has_meaningful_content, is_noise_element, INLINE_TAGS};

/// Selectors tried in order when picking the content container.
const CONTAINER_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".main-content",
];

/// What an accepted element will become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Heading(u8),
    Paragraph,
    List { ordered: bool },
    Table,
}

/// An accepted element in document order.
#[derive(Debug, Clone, Copy)]
pub struct ContentNode<'a> {
    pub kind: NodeKind,
    pub element: ElementRef<'a>,
}

/// Walker switches; mirrors the harvest options that affect traversal.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub include_tables: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_tables: true,
        }
    }
}

/// Picks the element most likely to hold the page's main content.
///
/// Tries the known container selectors in priority order, then the body,
/// then the document root.
pub fn select_primary_container(document: &Html) -> ElementRef<'_> {
    for selector in CONTAINER_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(found) = document.select(&sel).next() {
            return found;
        }
    }
    if let Ok(sel) = Selector::parse("body") {
        if let Some(body) = document.select(&sel).next() {
            return body;
        }
    }
    document.root_element()
}

/// Collects the container's content elements in document order.
pub fn collect_content_nodes<'a>(
    root: ElementRef<'a>,
    options: WalkOptions,
) -> Vec<ContentNode<'a>> {
    let mut nodes = Vec::new();
    let mut stack: Vec<NodeRef<'a, Node>> = Vec::new();
    push_children(*root, &mut stack);

    while let Some(node) = stack.pop() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if is_noise_element(element) {
            continue;
        }
        match accept(element, options) {
            Acceptance::Emit(kind) => nodes.push(ContentNode { kind, element }),
            Acceptance::Descend => push_children(node, &mut stack),
            Acceptance::Skip => {}
        }
    }
    nodes
}

enum Acceptance {
    Emit(NodeKind),
    Descend,
    Skip,
}

fn accept(element: ElementRef, options: WalkOptions) -> Acceptance {
    match element.value().name() {
        "h1" => Acceptance::Emit(NodeKind::Heading(1)),
        "h2" => Acceptance::Emit(NodeKind::Heading(2)),
        "h3" => Acceptance::Emit(NodeKind::Heading(3)),
        "h4" => Acceptance::Emit(NodeKind::Heading(4)),
        "h5" => Acceptance::Emit(NodeKind::Heading(5)),
        "h6" => Acceptance::Emit(NodeKind::Heading(6)),
        "p" => Acceptance::Emit(NodeKind::Paragraph),
        "ul" => Acceptance::Emit(NodeKind::List { ordered: false }),
        "ol" => Acceptance::Emit(NodeKind::List { ordered: true }),
        "table" => {
            if options.include_tables {
                Acceptance::Emit(NodeKind::Table)
            } else {
                Acceptance::Skip
            }
        }
        // A div holding only inline content is a text run; emit it as a
        // paragraph unless it reads like chrome. A div with element
        // structure below it is a container.
        "div" => {
            if has_only_inline_children(element) {
                if has_meaningful_content(&extract_text(element)) {
                    Acceptance::Emit(NodeKind::Paragraph)
                } else {
                    Acceptance::Skip
                }
            } else {
                Acceptance::Descend
            }
        }
        _ => Acceptance::Descend,
    }
}

fn has_only_inline_children(element: ElementRef) -> bool {
    element.children().all(|child| match child.value() {
        Node::Element(el) => {
            INLINE_TAGS.contains(&el.name()) || el.name() == "br" || el.name() == "img"
        }
        _ => true,
    })
}

fn push_children<'a>(node: NodeRef<'a, Node>, stack: &mut Vec<NodeRef<'a, Node>>) {
    // Reversed so popping yields document order.
    let children: Vec<_> = node.children().collect();
    for child in children.into_iter().rev() {
        stack.push(child);
    }
}

/// CSS-like structural path of an element, used for provenance selectors.
pub(crate) fn element_path(element: ElementRef) -> String {
    const MAX_DEPTH: usize = 6;
    let mut parts = Vec::new();
    let mut current = Some(element);
    while let Some(el) = current {
        let tag = el.value().name();
        if tag == "html" || parts.len() >= MAX_DEPTH {
            break;
        }
        let nth = nth_of_type(el);
        if nth > 1 {
            parts.push(format!("{tag}:nth-of-type({nth})"));
        } else {
            parts.push(tag.to_string());
        }
        current = el.parent().and_then(ElementRef::wrap);
    }
    parts.reverse();
    parts.join(" > ")
}

fn nth_of_type(element: ElementRef) -> usize {
    let tag = element.value().name();
    let mut nth = 1;
    for sibling in element.prev_siblings() {
        if let Some(el) = ElementRef::wrap(sibling) {
            if el.value().name() == tag {
                nth += 1;
            }
        }
    }
    nth
}

//! Helpers over `scraper` trees shared by the site scrapers.
//!
//! Everything here is read-only except [`detach_all`], which prunes
//! boilerplate from a document's working copy.

use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

pub static BR: Lazy<Selector> = Lazy::new(|| Selector::parse("br").unwrap());
pub static P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
pub static LIST: Lazy<Selector> = Lazy::new(|| Selector::parse("ul, ol").unwrap());
pub static LI: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());

/// Elements whose text is never rendered as content.
pub const HIDDEN_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "template", "noscript"];

pub fn is_hidden(name: &str) -> bool {
    HIDDEN_TEXT_ELEMENTS.contains(&name)
}

/// Whether `node` sits inside a script, style, template or noscript element.
fn in_hidden_element(node: NodeRef<'_, Node>) -> bool {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_hidden(ancestor.value().name()))
}

/// Descendant text nodes of `element` in document order, minus script and
/// style bodies.
pub fn visible_text<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element.descendants().filter_map(|node| match node.value() {
        Node::Text(text) if !in_hidden_element(node) => Some(&**text),
        _ => None,
    })
}

/// Text of every visible descendant text node, each trimmed, empties
/// skipped, joined with nothing in between.
pub fn stripped_text(element: ElementRef<'_>) -> String {
    visible_text(element)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Text of every visible descendant text node, concatenated untouched.
pub fn raw_text(element: ElementRef<'_>) -> String {
    visible_text(element).collect()
}

pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

pub fn name(element: ElementRef<'_>) -> &str {
    element.value().name()
}

pub fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Whether `element` has at least one descendant matching `selector`.
pub fn contains(element: ElementRef<'_>, selector: &Selector) -> bool {
    element.select(selector).next().is_some()
}

/// Element children of `element`, in document order.
pub fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// `style` is `text-align: right`, ignoring whitespace, ASCII case and
/// trailing semicolons.
pub fn is_style_right_aligned(element: ElementRef<'_>) -> bool {
    element.value().attr("style").is_some_and(|style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact
            .trim_end_matches(';')
            .eq_ignore_ascii_case("text-align:right")
    })
}

/// Right-aligned by inline style or by the `a-right` utility class.
pub fn is_right_aligned(element: ElementRef<'_>) -> bool {
    is_style_right_aligned(element) || has_class(element, "a-right")
}

pub fn element_by_id(document: &Html, id: NodeId) -> Option<ElementRef<'_>> {
    document.tree.get(id).and_then(ElementRef::wrap)
}

/// Detaches the given nodes (and their subtrees) from the document.
pub fn detach_all(document: &mut Html, ids: impl IntoIterator<Item = NodeId>) {
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Removes every descendant of `root` accepted by `doomed` and hands back the
/// pruned `root`.
pub fn prune<'a, F>(document: &'a mut Html, root: NodeId, doomed: F) -> Option<ElementRef<'a>>
where
    F: Fn(ElementRef<'_>) -> bool,
{
    let ids: Vec<NodeId> = element_by_id(document, root)?
        .descendants()
        .filter_map(ElementRef::wrap)
        .skip(1)
        .filter(|element| doomed(*element))
        .map(|element| element.id())
        .collect();
    detach_all(document, ids);
    let document: &'a Html = document;
    element_by_id(document, root)
}
